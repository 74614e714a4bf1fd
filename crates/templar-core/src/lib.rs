//! Core data model for the resolution and instantiation engine.
//!
//! This crate defines the shared vocabulary of the engine: hash-based
//! identity ([`FamilyId`], [`InstanceKey`]), the type-expression shape
//! language ([`TypeExpr`]), declarations and parameters ([`Declaration`],
//! [`Parameter`]), use-site arguments ([`Argument`], [`ArgSlot`]), bindings
//! ([`Binding`]), and the error taxonomy. It has no registry or resolution
//! logic of its own.

mod argument;
mod binding;
mod decl;
mod error;
mod ids;
mod quals;
mod ty;
mod value;

pub use argument::{ArgKind, ArgSlot, Argument};
pub use binding::{Binding, Bound};
pub use decl::{BaseInit, DeclKind, Declaration, ParamKind, Parameter};
pub use error::{RegistrationError, ResolutionError, SubstitutionFailure};
pub use ids::{BodyId, DeclId, FamilyId, InstanceKey, ScopeId};
pub use quals::{Quals, ValueCategory};
pub use ty::{Atom, RefKind, TypeExpr};
pub use value::ConstValue;

/// Built-in type atoms every registry starts with.
pub mod builtins {
    /// Names seeded into the known-type set before any registration.
    pub const TYPE_ATOMS: &[&str] = &[
        "void", "bool", "int", "uint", "long", "float", "double", "string",
    ];
}
