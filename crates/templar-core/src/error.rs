//! Unified error types for the resolution engine.
//!
//! ## Error Hierarchy
//!
//! ```text
//! RegistrationError  - declaration shape violations, raised at registration;
//!                      fatal to that registration only
//! ResolutionError    - surfaced by resolve(); deterministic for identical
//!                      inputs once the registry is frozen
//! SubstitutionFailure - per-candidate, non-fatal; swallowed by the resolver
//!                      and never surfaced to the caller of resolve()
//! ```
//!
//! `SubstitutionFailure` deliberately lives outside `ResolutionError`: a
//! candidate that fails to bind only shrinks the candidate set ("failure is
//! not an error"), so the type system keeps it from leaking outward.

use thiserror::Error;

/// Errors raised while registering declarations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// Registration attempted after `freeze()`.
    #[error("registration after freeze")]
    LateRegistration,

    /// More than one pack in a single parameter list.
    #[error("parameter list of '{family}' declares more than one pack")]
    MultiplePacks { family: String },

    /// A pack followed by parameters that are neither defaulted nor
    /// deducible.
    #[error("pack parameter of '{family}' must be last unless later parameters are defaulted or deducible")]
    MisplacedPack { family: String },

    /// A partial specialization parameter that its pattern cannot deduce.
    #[error("parameter {position} of a specialization of '{family}' is not deducible from its argument pattern")]
    NonDeducibleParameter { family: String, position: usize },

    /// A non-type parameter with a dependent declared type used where that
    /// dependency is what would be matched.
    #[error("non-type parameter {position} of a specialization of '{family}' has a dependent declared type and cannot be matched")]
    DependentNonTypePattern { family: String, position: usize },

    /// A partial specialization whose pattern restates the primary's
    /// parameter list under new names.
    #[error("partial specialization pattern of '{family}' does not differ from the primary parameter list")]
    PatternMatchesPrimary { family: String },

    /// Two declarations of one family in one scope both defaulting the same
    /// parameter position.
    #[error("duplicate default for parameter {position} of '{family}' in one scope")]
    DuplicateDefault { family: String, position: usize },

    /// A declared type, pattern, default, or base initializer referencing a
    /// parameter position outside the declaration's own list.
    #[error("parameter reference ${index} is out of range for a declaration of '{family}'")]
    ParameterOutOfRange { family: String, index: u16 },

    /// A concrete name used in a non-dependent position that is not a known
    /// type (stage one of two-phase lookup).
    #[error("unknown type name '{name}' in a non-dependent position")]
    UnknownName { name: String },

    /// A nested pattern or base initializer references a family that does
    /// not exist.
    #[error("unknown family '{name}'")]
    UnknownFamily { name: String },

    /// A specialization or overload registered before the family's primary.
    #[error("family '{family}' has no primary declaration")]
    MissingPrimary { family: String },

    /// A second primary for an existing family.
    #[error("family '{family}' already has a primary declaration")]
    DuplicatePrimary { family: String },

    /// A specialization declared an empty argument pattern.
    #[error("specialization of '{family}' has an empty argument pattern")]
    EmptyPattern { family: String },

    /// A full specialization whose pattern still references parameters.
    #[error("full specialization of '{family}' has a dependent argument pattern")]
    DependentFullSpecialization { family: String },
}

/// Errors surfaced by a resolution query.
///
/// All of these are returned to the caller verbatim and never retried: the
/// registry is frozen, so the same query yields the same answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    /// The candidate set is empty after filtering.
    #[error("no viable candidate for '{family}'")]
    NoViableCandidate { family: String },

    /// Ranking could not produce a unique winner after all tie-breaks.
    #[error("ambiguous resolution for '{family}': {candidates}")]
    AmbiguousResolution { family: String, candidates: String },

    /// An instantiation re-requested its own cache key while being built.
    #[error("circular instantiation of '{family}'")]
    CircularInstantiation { family: String },

    /// The queried family was never registered.
    #[error("unknown family '{name}'")]
    UnknownFamily { name: String },

    /// A resolution query before `freeze()`.
    #[error("resolution queried before freeze()")]
    NotFrozen,
}

/// A per-candidate binding failure.
///
/// Produced when a declaration's parameter list or pattern cannot be
/// satisfied by the supplied arguments. The resolver swallows these; they
/// only remove the candidate from consideration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionFailure {
    #[error("argument count does not fit the parameter list")]
    ArityMismatch,

    #[error("argument kind does not match the parameter kind")]
    KindMismatch,

    #[error("pattern does not match the argument")]
    PatternMismatch,

    #[error("conflicting deductions for one parameter")]
    InconsistentDeduction,

    #[error("reference binding requires an lvalue")]
    CategoryMismatch,

    #[error("binding would drop qualification")]
    QualificationMismatch,

    #[error("value does not satisfy the declared non-type parameter type")]
    ValueMismatch,

    #[error("no pack split leaves enough arguments for later parameters")]
    NoPackSplit,

    #[error("expression references a parameter with no binding")]
    UnboundParameter,

    #[error("name '{0}' is unknown after substitution")]
    UnknownDependentName(String),

    #[error("deduction slot has no default to fill it")]
    UnfilledDeductionSlot,
}
