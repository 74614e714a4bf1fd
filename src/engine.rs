//! Engine - the external interface.

use std::sync::Arc;

use templar_core::{
    ArgSlot, Argument, BaseInit, BodyId, DeclId, Parameter, RegistrationError, ResolutionError,
    ScopeId, TypeExpr,
};
use templar_registry::DeclarationRegistry;
use templar_resolve::{Instantiation, InstantiationCache, Resolver};

/// The realized definition handed to the downstream code generator:
/// body plus binding, with shared identity per (family, arguments) key.
pub type ResolvedInstantiation = Arc<Instantiation>;

/// Owns the declaration registry and the instantiation cache.
///
/// Registration happens single-threaded, then [`freeze`](Engine::freeze)
/// closes the world; after that [`resolve`](Engine::resolve) takes `&self`
/// and may run from many threads at once.
pub struct Engine {
    registry: DeclarationRegistry,
    cache: InstantiationCache,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            registry: DeclarationRegistry::new(),
            cache: InstantiationCache::new(),
        }
    }

    // ==========================================================================
    // Declaration submission
    // ==========================================================================

    /// Register a concrete type atom for stage-one name validation.
    pub fn register_type_atom(&mut self, name: &str) -> Result<(), RegistrationError> {
        self.registry.register_type_atom(name)
    }

    /// Register the primary declaration of a new family.
    pub fn register_primary(
        &mut self,
        name: &str,
        params: Vec<Parameter>,
        body: BodyId,
    ) -> Result<DeclId, RegistrationError> {
        self.registry
            .register_primary(name, params, body, ScopeId::default(), None)
    }

    /// Register a primary whose instantiations are explicitly constructed
    /// on a base family's instantiation.
    pub fn register_primary_with_base(
        &mut self,
        name: &str,
        params: Vec<Parameter>,
        body: BodyId,
        base: BaseInit,
    ) -> Result<DeclId, RegistrationError> {
        self.registry
            .register_primary(name, params, body, ScopeId::default(), Some(base))
    }

    /// Register a sibling overload for an existing family.
    pub fn register_overload(
        &mut self,
        family: &str,
        params: Vec<Parameter>,
        body: BodyId,
    ) -> Result<DeclId, RegistrationError> {
        self.registry
            .register_overload(family, params, body, ScopeId::default())
    }

    /// Register a partial specialization: its own parameters plus the
    /// argument pattern that deduces them.
    pub fn register_partial_specialization(
        &mut self,
        family: &str,
        pattern: Vec<TypeExpr>,
        params: Vec<Parameter>,
        body: BodyId,
    ) -> Result<DeclId, RegistrationError> {
        self.registry
            .register_partial_specialization(family, pattern, params, body, ScopeId::default())
    }

    /// Register a full specialization for an exact concrete argument list.
    pub fn register_full_specialization(
        &mut self,
        family: &str,
        args: Vec<Argument>,
        body: BodyId,
    ) -> Result<DeclId, RegistrationError> {
        self.registry
            .register_full_specialization(family, args, body, ScopeId::default())
    }

    // ==========================================================================
    // Lifecycle and queries
    // ==========================================================================

    /// Close the world: no further registrations, resolution becomes legal.
    pub fn freeze(&mut self) {
        self.registry.freeze();
    }

    pub fn is_frozen(&self) -> bool {
        self.registry.is_frozen()
    }

    pub fn registry(&self) -> &DeclarationRegistry {
        &self.registry
    }

    /// Resolve a use site: select the single applicable declaration, bind
    /// it, and get-or-create the memoized instantiation.
    ///
    /// # Errors
    ///
    /// See [`ResolutionError`]; results are deterministic for identical
    /// inputs once frozen.
    pub fn resolve(
        &self,
        family: &str,
        args: &[ArgSlot],
    ) -> Result<ResolvedInstantiation, ResolutionError> {
        Resolver::new(&self.registry, &self.cache).resolve(family, args)
    }
}
