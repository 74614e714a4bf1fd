//! Resolution and instantiation.
//!
//! The pipeline over a frozen registry:
//!
//! 1. [`bind`] - the argument binder, producing a per-candidate
//!    [`Binding`](templar_core::Binding) or a non-fatal failure.
//! 2. [`more_specific`] - the specificity comparator ranking viable
//!    candidates.
//! 3. [`Resolver`] - orchestrates candidate gathering, ranking, the
//!    explicit-specialization override, and cache lookup.
//! 4. [`InstantiationCache`] - exactly-once memoization of realized
//!    [`Instantiation`]s.

mod binder;
mod cache;
mod instance;
mod resolver;
mod specificity;

pub use binder::bind;
pub use cache::InstantiationCache;
pub use instance::{Instantiation, SharedStorage};
pub use resolver::Resolver;
pub use specificity::{Candidate, Specificity, more_specific};
