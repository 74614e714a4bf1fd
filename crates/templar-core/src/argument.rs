//! Use-site arguments.
//!
//! An argument is a fully-typed descriptor produced by the front end: a
//! concrete type, a compile-known value, or a reference to a family, plus
//! the cv-qualification and value-category metadata that forwarding-style
//! parameters preserve.

use std::fmt::{self, Display, Formatter};

use xxhash_rust::xxh64::xxh64;

use crate::quals::{Quals, ValueCategory};
use crate::ty::TypeExpr;
use crate::value::ConstValue;

/// Seed for canonical argument hashing.
const ARG_SEED: u64 = 0x5ea77ffbcdf5f302;

/// What an argument is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// A concrete type descriptor.
    Type(TypeExpr),
    /// A compile-known value.
    Value(ConstValue),
    /// A reference to a declaration family (for nested-family parameters).
    Family(crate::ty::Atom),
}

/// One concrete use-site argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Argument {
    pub kind: ArgKind,
    pub quals: Quals,
    pub category: ValueCategory,
}

impl Argument {
    /// A type argument from a temporary (rvalue, unqualified).
    pub fn of_type(ty: TypeExpr) -> Self {
        Argument {
            kind: ArgKind::Type(ty),
            quals: Quals::empty(),
            category: ValueCategory::Rvalue,
        }
    }

    /// A type argument naming an lvalue object.
    pub fn lvalue(ty: TypeExpr) -> Self {
        Argument {
            kind: ArgKind::Type(ty),
            quals: Quals::empty(),
            category: ValueCategory::Lvalue,
        }
    }

    /// A compile-known value argument.
    pub fn value(v: ConstValue) -> Self {
        Argument {
            kind: ArgKind::Value(v),
            quals: Quals::empty(),
            category: ValueCategory::Rvalue,
        }
    }

    /// A family-reference argument.
    pub fn family(name: impl Into<Box<str>>) -> Self {
        Argument {
            kind: ArgKind::Family(crate::ty::Atom::new(name)),
            quals: Quals::empty(),
            category: ValueCategory::Rvalue,
        }
    }

    /// Add cv-qualification to this argument.
    pub fn with_quals(mut self, quals: Quals) -> Self {
        self.quals = quals;
        self
    }

    /// The argument's full shape with qualification folded in.
    ///
    /// Used when matching specialization patterns, where qualification is
    /// part of what is matched.
    pub fn to_shape(&self) -> TypeExpr {
        match &self.kind {
            ArgKind::Type(ty) => TypeExpr::qualified(self.quals, ty.clone()),
            ArgKind::Value(v) => TypeExpr::Value(v.clone()),
            ArgKind::Family(name) => TypeExpr::FamilyRef(name.clone()),
        }
    }

    /// Canonical hash of this argument's identity.
    ///
    /// Qualification participates in identity (a `const int` argument is a
    /// different instantiation key than an `int` one); value category does
    /// not, since the cache keys only on fully-deduced concrete arguments.
    pub fn canonical_hash(&self) -> u64 {
        let mut buf = Vec::with_capacity(32);
        buf.push(self.quals.bits());
        match &self.kind {
            ArgKind::Type(ty) => {
                buf.push(0x01);
                ty.write_canonical(&mut buf);
            }
            ArgKind::Value(v) => {
                buf.push(0x02);
                v.write_canonical(&mut buf);
            }
            ArgKind::Family(name) => {
                buf.push(0x03);
                buf.extend_from_slice(name.as_str().as_bytes());
            }
        }
        xxh64(&buf, ARG_SEED)
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.quals.is_empty() {
            write!(f, "{} ", self.quals)?;
        }
        match &self.kind {
            ArgKind::Type(ty) => write!(f, "{ty}"),
            ArgKind::Value(v) => write!(f, "{v}"),
            ArgKind::Family(name) => write!(f, "{name}"),
        }
    }
}

/// One position of a use-site argument list.
///
/// A `Deduce` slot asks the engine to fill the position from the selected
/// parameter's default; a candidate whose parameter has no default at that
/// position fails to bind. Deduction results are never cached - only the
/// fully-deduced concrete list keys the instantiation cache.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgSlot {
    Concrete(Argument),
    Deduce,
}

impl ArgSlot {
    pub fn concrete(arg: Argument) -> Self {
        ArgSlot::Concrete(arg)
    }

    pub fn as_concrete(&self) -> Option<&Argument> {
        match self {
            ArgSlot::Concrete(a) => Some(a),
            ArgSlot::Deduce => None,
        }
    }
}

impl From<Argument> for ArgSlot {
    fn from(arg: Argument) -> Self {
        ArgSlot::Concrete(arg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_folds_quals() {
        let arg = Argument::of_type(TypeExpr::named("int")).with_quals(Quals::CONST);
        assert_eq!(arg.to_shape(), TypeExpr::with_const(TypeExpr::named("int")));
    }

    #[test]
    fn canonical_hash_ignores_category() {
        let a = Argument::of_type(TypeExpr::named("int"));
        let b = Argument::lvalue(TypeExpr::named("int"));
        assert_eq!(a.canonical_hash(), b.canonical_hash());
    }

    #[test]
    fn canonical_hash_respects_quals() {
        let a = Argument::of_type(TypeExpr::named("int"));
        let b = Argument::of_type(TypeExpr::named("int")).with_quals(Quals::CONST);
        assert_ne!(a.canonical_hash(), b.canonical_hash());
    }

    #[test]
    fn canonical_hash_distinguishes_kinds() {
        let t = Argument::of_type(TypeExpr::named("int"));
        let v = Argument::value(ConstValue::Int(0));
        assert_ne!(t.canonical_hash(), v.canonical_hash());
    }

    #[test]
    fn display() {
        let arg = Argument::lvalue(TypeExpr::named("int")).with_quals(Quals::CONST);
        assert_eq!(arg.to_string(), "const int");
    }
}
