//! Templar - a resolution and instantiation engine for families of
//! parametric declarations.
//!
//! Given a family of competing declarations (a primary, partial and full
//! specializations, sibling overloads) and a use site supplying concrete
//! arguments, the engine deterministically selects the single applicable
//! declaration, binds its parameters, and realizes exactly one definition
//! per unique argument substitution.
//!
//! # Usage
//!
//! ```
//! use templar::{ArgSlot, Argument, BodyId, Engine, Parameter, TypeExpr};
//!
//! let mut engine = Engine::new();
//! engine
//!     .register_primary("max", vec![Parameter::ty()], BodyId(1))
//!     .unwrap();
//! engine.freeze();
//!
//! let args = [ArgSlot::Concrete(Argument::of_type(TypeExpr::named("int")))];
//! let resolved = engine.resolve("max", &args).unwrap();
//! assert_eq!(resolved.body(), BodyId(1));
//! ```
//!
//! The registry follows a strict lifecycle: populate, [`Engine::freeze`],
//! then query-only. Resolution over the frozen registry is read-only and
//! safe to run from many threads; the instantiation cache is the one
//! shared-mutation point and guarantees exactly-once construction per key.

mod engine;

pub use engine::{Engine, ResolvedInstantiation};

pub use templar_core::{
    ArgKind, ArgSlot, Argument, Atom, BaseInit, Binding, BodyId, Bound, ConstValue, DeclId,
    DeclKind, Declaration, FamilyId, InstanceKey, ParamKind, Parameter, Quals, RefKind,
    RegistrationError, ResolutionError, ScopeId, SubstitutionFailure, TypeExpr, ValueCategory,
};
pub use templar_registry::{DeclarationRegistry, Family};
pub use templar_resolve::{
    Candidate, Instantiation, InstantiationCache, Resolver, SharedStorage, Specificity, bind,
    more_specific,
};
