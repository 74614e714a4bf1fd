//! Declarations and their parameter lists.

use std::fmt::{self, Display, Formatter};

use crate::argument::Argument;
use crate::ids::{BodyId, DeclId, FamilyId, ScopeId};
use crate::ty::TypeExpr;

/// Kind of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// A type parameter. `declared` is the shape the use-site argument must
    /// match, referencing this parameter itself (e.g. `$0*`, `$0&&`); `None`
    /// deduces the whole argument type by value.
    Type { declared: Option<TypeExpr> },
    /// A non-type parameter with a declared type, itself possibly dependent
    /// on an earlier parameter of the same list.
    NonType { declared: TypeExpr },
    /// A nested-family parameter: the argument must be a family whose
    /// primary takes a parameter list of this arity.
    Family { params: Vec<Parameter> },
}

/// One parameter of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Option<String>,
    pub kind: ParamKind,
    pub is_pack: bool,
    pub default: Option<Argument>,
}

impl Parameter {
    /// A plain deduced type parameter.
    pub fn ty() -> Self {
        Parameter {
            name: None,
            kind: ParamKind::Type { declared: None },
            is_pack: false,
            default: None,
        }
    }

    /// A type parameter whose argument must match `declared`.
    pub fn ty_declared(declared: TypeExpr) -> Self {
        Parameter {
            name: None,
            kind: ParamKind::Type {
                declared: Some(declared),
            },
            is_pack: false,
            default: None,
        }
    }

    /// A non-type parameter of the given declared type.
    pub fn non_type(declared: TypeExpr) -> Self {
        Parameter {
            name: None,
            kind: ParamKind::NonType { declared },
            is_pack: false,
            default: None,
        }
    }

    /// A nested-family parameter taking the given parameter list.
    pub fn family(params: Vec<Parameter>) -> Self {
        Parameter {
            name: None,
            kind: ParamKind::Family { params },
            is_pack: false,
            default: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn pack(mut self) -> Self {
        self.is_pack = true;
        self
    }

    pub fn with_default(mut self, default: Argument) -> Self {
        self.default = Some(default);
        self
    }

    /// The declared shape the binder matches arguments against, if any.
    pub fn declared(&self) -> Option<&TypeExpr> {
        match &self.kind {
            ParamKind::Type { declared } => declared.as_ref(),
            ParamKind::NonType { declared } => Some(declared),
            ParamKind::Family { .. } => None,
        }
    }
}

/// Kind of a declaration within its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Primary,
    PartialSpecialization,
    FullSpecialization,
    Overload,
}

/// Explicit base construction: a declaration whose instantiations are built
/// on top of another family's instantiation must name the base family and
/// its concrete construction arguments (possibly referencing this
/// declaration's parameters). There is no implicit fallback; a missing base
/// initializer is a registration error, not a silent late failure.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseInit {
    pub family: String,
    pub args: Vec<TypeExpr>,
}

impl BaseInit {
    pub fn new(family: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        BaseInit {
            family: family.into(),
            args,
        }
    }
}

/// One declaration of a family.
///
/// Never mutated after registration. `pattern` is present only for
/// specializations: the ordered argument expressions the use-site arguments
/// must match, referencing this declaration's own parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub id: DeclId,
    pub kind: DeclKind,
    pub family: FamilyId,
    pub params: Vec<Parameter>,
    pub pattern: Option<Vec<TypeExpr>>,
    pub body: BodyId,
    pub scope: ScopeId,
    pub base: Option<BaseInit>,
}

impl Declaration {
    /// Index of the pack parameter, if the list has one.
    pub fn pack_index(&self) -> Option<usize> {
        self.params.iter().position(|p| p.is_pack)
    }

    /// Whether the parameter list ends in a pack.
    pub fn has_trailing_pack(&self) -> bool {
        self.params.last().is_some_and(|p| p.is_pack)
    }

    /// Whether this declaration participates in specificity ranking.
    ///
    /// Full specializations are matched after ranking; they never compete
    /// in the tournament.
    pub fn is_rankable(&self) -> bool {
        !matches!(self.kind, DeclKind::FullSpecialization)
    }

    /// Human-readable signature for diagnostics.
    pub fn signature(&self) -> String {
        let positions: Vec<String> = match &self.pattern {
            Some(pattern) => pattern.iter().map(|p| p.to_string()).collect(),
            None => self
                .params
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let mut s = match p.declared() {
                        Some(d) => d.to_string(),
                        None => format!("${i}"),
                    };
                    if p.is_pack {
                        s.push_str("...");
                    }
                    s
                })
                .collect(),
        };
        format!("<{}>", positions.join(", "))
    }
}

impl Display for Declaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{BodyId, DeclId, FamilyId, ScopeId};

    fn decl(params: Vec<Parameter>, pattern: Option<Vec<TypeExpr>>) -> Declaration {
        Declaration {
            id: DeclId(0),
            kind: if pattern.is_some() {
                DeclKind::PartialSpecialization
            } else {
                DeclKind::Primary
            },
            family: FamilyId::from_name("f"),
            params,
            pattern,
            body: BodyId(0),
            scope: ScopeId::default(),
            base: None,
        }
    }

    #[test]
    fn pack_index() {
        let d = decl(vec![Parameter::ty(), Parameter::ty().pack()], None);
        assert_eq!(d.pack_index(), Some(1));
        assert!(d.has_trailing_pack());

        let d = decl(vec![Parameter::ty()], None);
        assert_eq!(d.pack_index(), None);
        assert!(!d.has_trailing_pack());
    }

    #[test]
    fn signature_shows_pattern_when_present() {
        let d = decl(
            vec![Parameter::ty()],
            Some(vec![TypeExpr::pointer(TypeExpr::param(0))]),
        );
        assert_eq!(d.signature(), "<$0*>");
    }

    #[test]
    fn signature_shows_declared_shapes() {
        let d = decl(
            vec![
                Parameter::ty(),
                Parameter::ty_declared(TypeExpr::forwarding(1)),
            ],
            None,
        );
        assert_eq!(d.signature(), "<$0, $1&&>");
    }

    #[test]
    fn full_specializations_not_rankable() {
        let mut d = decl(vec![], Some(vec![TypeExpr::named("int")]));
        d.kind = DeclKind::FullSpecialization;
        assert!(!d.is_rankable());
    }
}
