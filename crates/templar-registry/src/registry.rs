//! DeclarationRegistry - storage for declaration families.
//!
//! # Storage Model
//!
//! - **Families**: all declarations of one logical name, stored together in
//!   insertion order. Insertion order is a tie-break of last resort only,
//!   never a correctness input.
//! - **Known types**: the set of concrete type atoms stage-one name
//!   validation checks against, seeded with the built-ins.
//!
//! # Lifecycle
//!
//! The registry is populated single-threaded, then frozen. After
//! [`freeze`](DeclarationRegistry::freeze) every registration fails with
//! `LateRegistration` and the registry is effectively read-only, so
//! resolution queries may run fully in parallel without locking.

use rustc_hash::{FxHashMap, FxHashSet};

use templar_core::{
    Argument, Atom, BaseInit, BodyId, DeclId, DeclKind, Declaration, FamilyId, Parameter,
    RegistrationError, ScopeId, TypeExpr, builtins,
};

use crate::validate;

/// All declarations sharing one logical name.
#[derive(Debug)]
pub struct Family {
    pub id: FamilyId,
    pub name: String,
    decls: Vec<Declaration>,
}

impl Family {
    /// All declarations, in insertion order.
    pub fn declarations(&self) -> &[Declaration] {
        &self.decls
    }

    /// The primary declaration, if registered.
    pub fn primary(&self) -> Option<&Declaration> {
        self.decls.iter().find(|d| d.kind == DeclKind::Primary)
    }

    /// Declarations that participate in specificity ranking.
    pub fn rankable(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter().filter(|d| d.is_rankable())
    }

    /// Full specializations, checked after ranking.
    pub fn full_specializations(&self) -> impl Iterator<Item = &Declaration> {
        self.decls
            .iter()
            .filter(|d| d.kind == DeclKind::FullSpecialization)
    }

    /// Look up a declaration by id.
    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.iter().find(|d| d.id == id)
    }
}

/// Storage for declaration families with a populate/freeze/query lifecycle.
pub struct DeclarationRegistry {
    families: FxHashMap<FamilyId, Family>,
    known_types: FxHashSet<Atom>,
    next_decl: u32,
    frozen: bool,
}

impl Default for DeclarationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationRegistry {
    /// Create a registry seeded with the built-in type atoms.
    pub fn new() -> Self {
        let mut known_types = FxHashSet::default();
        for name in builtins::TYPE_ATOMS {
            known_types.insert(Atom::new(*name));
        }
        DeclarationRegistry {
            families: FxHashMap::default(),
            known_types,
            next_decl: 0,
            frozen: false,
        }
    }

    // ==========================================================================
    // Lifecycle
    // ==========================================================================

    /// Transition to read-only. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    // ==========================================================================
    // Known-type atoms
    // ==========================================================================

    /// Extend the known-type set (pre-freeze only).
    pub fn register_type_atom(&mut self, name: &str) -> Result<(), RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::LateRegistration);
        }
        self.known_types.insert(Atom::new(name));
        Ok(())
    }

    pub fn is_known_type(&self, name: &str) -> bool {
        self.known_types.contains(&Atom::new(name))
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register the primary declaration of a new family.
    pub fn register_primary(
        &mut self,
        name: &str,
        params: Vec<Parameter>,
        body: BodyId,
        scope: ScopeId,
        base: Option<BaseInit>,
    ) -> Result<DeclId, RegistrationError> {
        self.register_decl(name, DeclKind::Primary, params, None, body, scope, base)
    }

    /// Register a sibling overload for an existing family.
    pub fn register_overload(
        &mut self,
        family: &str,
        params: Vec<Parameter>,
        body: BodyId,
        scope: ScopeId,
    ) -> Result<DeclId, RegistrationError> {
        self.register_decl(family, DeclKind::Overload, params, None, body, scope, None)
    }

    /// Register a partial specialization for an existing family.
    pub fn register_partial_specialization(
        &mut self,
        family: &str,
        pattern: Vec<TypeExpr>,
        params: Vec<Parameter>,
        body: BodyId,
        scope: ScopeId,
    ) -> Result<DeclId, RegistrationError> {
        self.register_decl(
            family,
            DeclKind::PartialSpecialization,
            params,
            Some(pattern),
            body,
            scope,
            None,
        )
    }

    /// Register a full specialization for an existing family.
    ///
    /// The concrete arguments become the declaration's pattern; it has no
    /// parameters of its own.
    pub fn register_full_specialization(
        &mut self,
        family: &str,
        args: Vec<Argument>,
        body: BodyId,
        scope: ScopeId,
    ) -> Result<DeclId, RegistrationError> {
        let pattern: Vec<TypeExpr> = args.iter().map(Argument::to_shape).collect();
        self.register_decl(
            family,
            DeclKind::FullSpecialization,
            Vec::new(),
            Some(pattern),
            body,
            scope,
            None,
        )
    }

    fn register_decl(
        &mut self,
        family_name: &str,
        kind: DeclKind,
        params: Vec<Parameter>,
        pattern: Option<Vec<TypeExpr>>,
        body: BodyId,
        scope: ScopeId,
        base: Option<BaseInit>,
    ) -> Result<DeclId, RegistrationError> {
        if self.frozen {
            return Err(RegistrationError::LateRegistration);
        }

        validate::check_params(family_name, &params, pattern.as_deref())?;
        validate::check_stage1_names(&self.known_types, &params, pattern.as_deref(), base.as_ref())?;

        let family_id = FamilyId::from_name(family_name);

        match kind {
            DeclKind::Primary => {
                if self
                    .families
                    .get(&family_id)
                    .is_some_and(|f| f.primary().is_some())
                {
                    return Err(RegistrationError::DuplicatePrimary {
                        family: family_name.to_string(),
                    });
                }
            }
            DeclKind::Overload | DeclKind::PartialSpecialization | DeclKind::FullSpecialization => {
                let family = self.families.get(&family_id).ok_or_else(|| {
                    RegistrationError::UnknownFamily {
                        name: family_name.to_string(),
                    }
                })?;
                let primary =
                    family
                        .primary()
                        .ok_or_else(|| RegistrationError::MissingPrimary {
                            family: family_name.to_string(),
                        })?;

                match (&kind, &pattern) {
                    (DeclKind::PartialSpecialization, Some(p)) => {
                        validate::check_partial_pattern(family_name, &params, p, primary)?;
                    }
                    (DeclKind::FullSpecialization, Some(p)) => {
                        if p.is_empty() {
                            return Err(RegistrationError::EmptyPattern {
                                family: family_name.to_string(),
                            });
                        }
                        if p.iter().any(TypeExpr::is_dependent) {
                            return Err(RegistrationError::DependentFullSpecialization {
                                family: family_name.to_string(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        validate::check_param_refs(family_name, &params, pattern.as_deref(), base.as_ref())?;

        if let Some(family) = self.families.get(&family_id) {
            validate::check_duplicate_defaults(family_name, &family.decls, &params, scope)?;
        }

        let id = DeclId(self.next_decl);
        self.next_decl += 1;

        let decl = Declaration {
            id,
            kind,
            family: family_id,
            params,
            pattern,
            body,
            scope,
            base,
        };

        self.families
            .entry(family_id)
            .or_insert_with(|| Family {
                id: family_id,
                name: family_name.to_string(),
                decls: Vec::new(),
            })
            .decls
            .push(decl);

        Ok(id)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Look up a family by logical name.
    pub fn lookup_family(&self, name: &str) -> Option<&Family> {
        self.families.get(&FamilyId::from_name(name))
    }

    /// Look up a family by id.
    pub fn family(&self, id: FamilyId) -> Option<&Family> {
        self.families.get(&id)
    }

    /// Number of registered families.
    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    /// Total number of registered declarations.
    pub fn declaration_count(&self) -> usize {
        self.families.values().map(|f| f.decls.len()).sum()
    }
}

impl std::fmt::Debug for DeclarationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclarationRegistry")
            .field("families", &self.families.len())
            .field("declarations", &self.declaration_count())
            .field("frozen", &self.frozen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(n: u64) -> BodyId {
        BodyId(n)
    }

    #[test]
    fn new_registry_is_empty_and_unfrozen() {
        let registry = DeclarationRegistry::new();
        assert_eq!(registry.family_count(), 0);
        assert!(!registry.is_frozen());
        assert!(registry.is_known_type("int"));
        assert!(!registry.is_known_type("widget"));
    }

    #[test]
    fn register_primary_creates_family() {
        let mut registry = DeclarationRegistry::new();
        let id = registry
            .register_primary("f", vec![Parameter::ty()], body(1), ScopeId::default(), None)
            .unwrap();

        let family = registry.lookup_family("f").unwrap();
        assert_eq!(family.name, "f");
        assert_eq!(family.declarations().len(), 1);
        assert_eq!(family.primary().unwrap().id, id);
    }

    #[test]
    fn duplicate_primary_rejected() {
        let mut registry = DeclarationRegistry::new();
        registry
            .register_primary("f", vec![Parameter::ty()], body(1), ScopeId::default(), None)
            .unwrap();
        let result = registry.register_primary(
            "f",
            vec![Parameter::ty()],
            body(2),
            ScopeId::default(),
            None,
        );
        assert!(matches!(
            result,
            Err(RegistrationError::DuplicatePrimary { .. })
        ));
    }

    #[test]
    fn specialization_requires_primary() {
        let mut registry = DeclarationRegistry::new();
        let result = registry.register_full_specialization(
            "f",
            vec![Argument::of_type(TypeExpr::named("int"))],
            body(1),
            ScopeId::default(),
        );
        assert!(matches!(
            result,
            Err(RegistrationError::UnknownFamily { .. })
        ));
    }

    #[test]
    fn late_registration_rejected() {
        let mut registry = DeclarationRegistry::new();
        registry.freeze();
        let result = registry.register_primary(
            "f",
            vec![Parameter::ty()],
            body(1),
            ScopeId::default(),
            None,
        );
        assert_eq!(result, Err(RegistrationError::LateRegistration));
        assert_eq!(
            registry.register_type_atom("widget"),
            Err(RegistrationError::LateRegistration)
        );
    }

    #[test]
    fn freeze_is_idempotent() {
        let mut registry = DeclarationRegistry::new();
        registry.freeze();
        registry.freeze();
        assert!(registry.is_frozen());
    }

    #[test]
    fn insertion_order_preserved() {
        let mut registry = DeclarationRegistry::new();
        registry
            .register_primary("f", vec![Parameter::ty()], body(1), ScopeId::default(), None)
            .unwrap();
        registry
            .register_overload(
                "f",
                vec![Parameter::ty(), Parameter::ty()],
                body(2),
                ScopeId::default(),
            )
            .unwrap();
        registry
            .register_partial_specialization(
                "f",
                vec![TypeExpr::pointer(TypeExpr::param(0))],
                vec![Parameter::ty()],
                body(3),
                ScopeId::default(),
            )
            .unwrap();

        let family = registry.lookup_family("f").unwrap();
        let kinds: Vec<DeclKind> = family.declarations().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DeclKind::Primary,
                DeclKind::Overload,
                DeclKind::PartialSpecialization
            ]
        );
    }

    #[test]
    fn full_specialization_pattern_from_arguments() {
        let mut registry = DeclarationRegistry::new();
        registry
            .register_primary(
                "g",
                vec![Parameter::ty(), Parameter::ty()],
                body(1),
                ScopeId::default(),
                None,
            )
            .unwrap();
        registry
            .register_full_specialization(
                "g",
                vec![
                    Argument::of_type(TypeExpr::named("int")),
                    Argument::of_type(TypeExpr::pointer(TypeExpr::named("int"))),
                ],
                body(2),
                ScopeId::default(),
            )
            .unwrap();

        let family = registry.lookup_family("g").unwrap();
        let spec = family.full_specializations().next().unwrap();
        assert_eq!(
            spec.pattern.as_deref().unwrap(),
            &[
                TypeExpr::named("int"),
                TypeExpr::pointer(TypeExpr::named("int"))
            ]
        );
        assert!(spec.params.is_empty());
    }

    #[test]
    fn dangling_parameter_reference_rejected() {
        let mut registry = DeclarationRegistry::new();
        let result = registry.register_primary(
            "f",
            vec![Parameter::ty_declared(TypeExpr::param(7))],
            body(1),
            ScopeId::default(),
            None,
        );
        assert_eq!(
            result,
            Err(RegistrationError::ParameterOutOfRange {
                family: "f".to_string(),
                index: 7
            })
        );
    }

    #[test]
    fn unknown_name_in_declared_type_rejected() {
        let mut registry = DeclarationRegistry::new();
        let result = registry.register_primary(
            "f",
            vec![Parameter::non_type(TypeExpr::named("gadget"))],
            body(1),
            ScopeId::default(),
            None,
        );
        assert_eq!(
            result,
            Err(RegistrationError::UnknownName {
                name: "gadget".to_string()
            })
        );
    }

    #[test]
    fn registered_atom_becomes_known() {
        let mut registry = DeclarationRegistry::new();
        registry.register_type_atom("gadget").unwrap();
        let result = registry.register_primary(
            "f",
            vec![Parameter::non_type(TypeExpr::named("gadget"))],
            body(1),
            ScopeId::default(),
            None,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn lookup_unknown_family_is_none() {
        let registry = DeclarationRegistry::new();
        assert!(registry.lookup_family("missing").is_none());
    }
}
