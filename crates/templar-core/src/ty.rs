//! Type expressions - the shared shape language.
//!
//! One expression type covers three roles:
//!
//! - the declared type of a parameter (possibly referencing earlier
//!   parameters of the same list),
//! - a specialization's argument pattern (referencing the specialization's
//!   own parameters),
//! - a fully-concrete argument descriptor at a use site (no parameter
//!   references).
//!
//! Whether parameter references are legal in a given position is enforced by
//! the registry at registration time, not by the type itself.

use std::fmt::{self, Display, Formatter};

use xxhash_rust::xxh64::xxh64;

use crate::quals::Quals;
use crate::value::ConstValue;

/// Seed for canonical shape hashing.
const SHAPE_SEED: u64 = 0x2fac10b63a6cc57c;

/// An interned-style type name ("int", "double", user atoms).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Atom(Box<str>);

impl Atom {
    pub fn new(name: impl Into<Box<str>>) -> Self {
        Atom(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::new(s)
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a reference shape.
///
/// `Forwarding` is only legal as a parameter's declared type: an unqualified
/// rvalue reference to that declaration's own deduced type parameter. A
/// cv-qualified reference, or a reference to a parameter of an enclosing
/// list, is a plain `Rvalue` reference and binds like one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Lvalue,
    Rvalue,
    Forwarding,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A concrete named type.
    Named(Atom),
    /// Reference to parameter *n* of the declaring parameter list.
    Param(u16),
    /// Pointer to a pointee shape.
    Pointer(Box<TypeExpr>),
    /// Reference to a referent shape.
    Reference(RefKind, Box<TypeExpr>),
    /// cv-qualified shape.
    Qualified(Quals, Box<TypeExpr>),
    /// Nested family application, e.g. `vector<T>`.
    Apply { family: Atom, args: Vec<TypeExpr> },
    /// A bare reference to a family itself (matches a family argument).
    FamilyRef(Atom),
    /// A name nested under a parameter, e.g. `T::iterator`. Resolved only
    /// at instantiation, against the concrete binding (two-phase lookup).
    Dependent { base: u16, name: Atom },
    /// Pattern position only: expands a pack parameter.
    PackExpansion(Box<TypeExpr>),
    /// Compile-known value in non-type pattern position.
    Value(ConstValue),
}

impl TypeExpr {
    pub fn named(name: impl Into<Box<str>>) -> Self {
        TypeExpr::Named(Atom::new(name))
    }

    pub fn param(index: u16) -> Self {
        TypeExpr::Param(index)
    }

    pub fn pointer(pointee: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(pointee))
    }

    pub fn lvalue_ref(referent: TypeExpr) -> Self {
        TypeExpr::Reference(RefKind::Lvalue, Box::new(referent))
    }

    pub fn rvalue_ref(referent: TypeExpr) -> Self {
        TypeExpr::Reference(RefKind::Rvalue, Box::new(referent))
    }

    /// A forwarding reference to this list's own parameter `index`.
    pub fn forwarding(index: u16) -> Self {
        TypeExpr::Reference(RefKind::Forwarding, Box::new(TypeExpr::Param(index)))
    }

    pub fn qualified(quals: Quals, inner: TypeExpr) -> Self {
        if quals.is_empty() {
            inner
        } else if let TypeExpr::Qualified(q, boxed) = inner {
            TypeExpr::Qualified(q | quals, boxed)
        } else {
            TypeExpr::Qualified(quals, Box::new(inner))
        }
    }

    pub fn with_const(inner: TypeExpr) -> Self {
        TypeExpr::qualified(Quals::CONST, inner)
    }

    pub fn apply(family: impl Into<Box<str>>, args: Vec<TypeExpr>) -> Self {
        TypeExpr::Apply {
            family: Atom::new(family),
            args,
        }
    }

    pub fn dependent(base: u16, name: impl Into<Box<str>>) -> Self {
        TypeExpr::Dependent {
            base,
            name: Atom::new(name),
        }
    }

    pub fn pack(pattern: TypeExpr) -> Self {
        TypeExpr::PackExpansion(Box::new(pattern))
    }

    pub fn value(v: ConstValue) -> Self {
        TypeExpr::Value(v)
    }

    /// Whether this expression references any parameter (directly, through a
    /// dependent name, or through a pack expansion).
    pub fn is_dependent(&self) -> bool {
        match self {
            TypeExpr::Named(_) | TypeExpr::FamilyRef(_) | TypeExpr::Value(_) => false,
            TypeExpr::Param(_) | TypeExpr::Dependent { .. } | TypeExpr::PackExpansion(_) => true,
            TypeExpr::Pointer(inner)
            | TypeExpr::Reference(_, inner)
            | TypeExpr::Qualified(_, inner) => inner.is_dependent(),
            TypeExpr::Apply { args, .. } => args.iter().any(TypeExpr::is_dependent),
        }
    }

    /// Visit every parameter index referenced by this expression.
    pub fn visit_params(&self, f: &mut impl FnMut(u16)) {
        match self {
            TypeExpr::Param(i) => f(*i),
            TypeExpr::Dependent { base, .. } => f(*base),
            TypeExpr::Pointer(inner)
            | TypeExpr::Reference(_, inner)
            | TypeExpr::Qualified(_, inner)
            | TypeExpr::PackExpansion(inner) => inner.visit_params(f),
            TypeExpr::Apply { args, .. } => {
                for a in args {
                    a.visit_params(f);
                }
            }
            TypeExpr::Named(_) | TypeExpr::FamilyRef(_) | TypeExpr::Value(_) => {}
        }
    }

    /// Visit every concrete named atom in this expression.
    ///
    /// Dependent names are not visited; they do not exist until substitution
    /// produces them (stage two of two-phase lookup).
    pub fn visit_named(&self, f: &mut impl FnMut(&Atom)) {
        match self {
            TypeExpr::Named(a) => f(a),
            TypeExpr::Pointer(inner)
            | TypeExpr::Reference(_, inner)
            | TypeExpr::Qualified(_, inner)
            | TypeExpr::PackExpansion(inner) => inner.visit_named(f),
            TypeExpr::Apply { args, .. } => {
                for a in args {
                    a.visit_named(f);
                }
            }
            TypeExpr::Param(_)
            | TypeExpr::FamilyRef(_)
            | TypeExpr::Dependent { .. }
            | TypeExpr::Value(_) => {}
        }
    }

    /// Visit every family name referenced by this expression.
    pub fn visit_families(&self, f: &mut impl FnMut(&Atom)) {
        match self {
            TypeExpr::Apply { family, args } => {
                f(family);
                for a in args {
                    a.visit_families(f);
                }
            }
            TypeExpr::FamilyRef(family) => f(family),
            TypeExpr::Pointer(inner)
            | TypeExpr::Reference(_, inner)
            | TypeExpr::Qualified(_, inner)
            | TypeExpr::PackExpansion(inner) => inner.visit_families(f),
            TypeExpr::Named(_)
            | TypeExpr::Param(_)
            | TypeExpr::Dependent { .. }
            | TypeExpr::Value(_) => {}
        }
    }

    /// Append a canonical byte form, used for instance-key hashing.
    ///
    /// Only valid for concrete expressions; parameter references are hashed
    /// by index, so callers must substitute first if identity across
    /// different declarations matters.
    pub fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            TypeExpr::Named(a) => {
                out.push(0x10);
                write_atom(a, out);
            }
            TypeExpr::Param(i) => {
                out.push(0x11);
                out.extend_from_slice(&i.to_le_bytes());
            }
            TypeExpr::Pointer(inner) => {
                out.push(0x12);
                inner.write_canonical(out);
            }
            TypeExpr::Reference(kind, inner) => {
                out.push(0x13);
                out.push(match kind {
                    RefKind::Lvalue => 0,
                    RefKind::Rvalue => 1,
                    RefKind::Forwarding => 2,
                });
                inner.write_canonical(out);
            }
            TypeExpr::Qualified(quals, inner) => {
                out.push(0x14);
                out.push(quals.bits());
                inner.write_canonical(out);
            }
            TypeExpr::Apply { family, args } => {
                out.push(0x15);
                write_atom(family, out);
                out.extend_from_slice(&(args.len() as u32).to_le_bytes());
                for a in args {
                    a.write_canonical(out);
                }
            }
            TypeExpr::FamilyRef(family) => {
                out.push(0x16);
                write_atom(family, out);
            }
            TypeExpr::Dependent { base, name } => {
                out.push(0x17);
                out.extend_from_slice(&base.to_le_bytes());
                write_atom(name, out);
            }
            TypeExpr::PackExpansion(inner) => {
                out.push(0x18);
                inner.write_canonical(out);
            }
            TypeExpr::Value(v) => {
                out.push(0x19);
                v.write_canonical(out);
            }
        }
    }

    /// Canonical 64-bit hash of this shape.
    pub fn canonical_hash(&self) -> u64 {
        let mut buf = Vec::with_capacity(32);
        self.write_canonical(&mut buf);
        xxh64(&buf, SHAPE_SEED)
    }
}

fn write_atom(atom: &Atom, out: &mut Vec<u8>) {
    out.extend_from_slice(&(atom.as_str().len() as u64).to_le_bytes());
    out.extend_from_slice(atom.as_str().as_bytes());
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(a) => write!(f, "{a}"),
            TypeExpr::Param(i) => write!(f, "${i}"),
            TypeExpr::Pointer(inner) => write!(f, "{inner}*"),
            TypeExpr::Reference(RefKind::Lvalue, inner) => write!(f, "{inner}&"),
            TypeExpr::Reference(_, inner) => write!(f, "{inner}&&"),
            TypeExpr::Qualified(quals, inner) => write!(f, "{quals} {inner}"),
            TypeExpr::Apply { family, args } => {
                write!(f, "{family}<")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ">")
            }
            TypeExpr::FamilyRef(family) => write!(f, "{family}"),
            TypeExpr::Dependent { base, name } => write!(f, "${base}::{name}"),
            TypeExpr::PackExpansion(inner) => write!(f, "{inner}..."),
            TypeExpr::Value(v) => write!(f, "{v}"),
        }
    }
}
