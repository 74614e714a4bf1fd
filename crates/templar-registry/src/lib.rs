//! Declaration registry.
//!
//! Central storage for declaration families with a strict lifecycle:
//! populate, [`freeze`](DeclarationRegistry::freeze), then query-only. The
//! closed world after `freeze()` is what makes specificity ranking
//! deterministic.

mod registry;
mod validate;

pub use registry::{DeclarationRegistry, Family};
