//! Resolver.
//!
//! Orchestrates one resolution query over a frozen registry: collect the
//! family's candidates, filter to the viable ones through the binder, rank
//! them with the specificity comparator, apply the explicit-specialization
//! override, then get-or-create the instantiation.

use std::sync::Arc;

use templar_core::{
    ArgSlot, Argument, BaseInit, Binding, Declaration, InstanceKey, ResolutionError, TypeExpr,
};
use templar_registry::{DeclarationRegistry, Family};

use crate::binder::{self, BindMode, Ctx};
use crate::cache::InstantiationCache;
use crate::instance::Instantiation;
use crate::specificity::{Candidate, Specificity, more_specific};

/// One resolution front over a registry and cache pair.
pub struct Resolver<'a> {
    registry: &'a DeclarationRegistry,
    cache: &'a InstantiationCache,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a DeclarationRegistry, cache: &'a InstantiationCache) -> Self {
        Resolver { registry, cache }
    }

    /// Resolve a use site against a family.
    ///
    /// # Errors
    ///
    /// `NotFrozen` before `freeze()`, `UnknownFamily` for an unregistered
    /// name, `NoViableCandidate` when every candidate fails to bind,
    /// `AmbiguousResolution` when ranking has no unique winner, and
    /// `CircularInstantiation` for self-referential instantiation chains.
    pub fn resolve(
        &self,
        family_name: &str,
        args: &[ArgSlot],
    ) -> Result<Arc<Instantiation>, ResolutionError> {
        if !self.registry.is_frozen() {
            return Err(ResolutionError::NotFrozen);
        }
        let family = self.registry.lookup_family(family_name).ok_or_else(|| {
            ResolutionError::UnknownFamily {
                name: family_name.to_string(),
            }
        })?;

        // CollectCandidates + FilterViable: binding failures silently
        // shrink the set.
        let candidates: Vec<Candidate<'_>> = family
            .rankable()
            .filter_map(|decl| {
                binder::bind(decl, args, self.registry)
                    .ok()
                    .map(|binding| Candidate { decl, binding })
            })
            .collect();
        if candidates.is_empty() {
            return Err(ResolutionError::NoViableCandidate {
                family: family.name.clone(),
            });
        }

        let winner = &candidates[self.select_best(family, &candidates)?];

        // The ranked winner fixes the deduction; the identity list it
        // implies keys the cache and is what a full specialization must
        // match exactly.
        let identity = identity_arguments(args, winner);
        let selected = self
            .full_specialization_for(family, &identity)
            .unwrap_or(winner.decl);

        let hashes: Vec<u64> = identity.iter().map(Argument::canonical_hash).collect();
        let key = InstanceKey::from_parts(family.id, &hashes);

        self.cache.get_or_create(key, &family.name, || {
            let base = match &selected.base {
                Some(init) => Some(self.instantiate_base(init, &winner.binding)?),
                None => None,
            };
            Ok(Instantiation::new(
                key,
                family.id,
                selected.id,
                selected.body,
                winner.binding.clone(),
                base,
            ))
        })
    }

    /// Rank: pairwise tournament. The winner must be strictly more
    /// specific than every other viable candidate; registration order
    /// never breaks a `Neither`.
    fn select_best(
        &self,
        family: &Family,
        candidates: &[Candidate<'_>],
    ) -> Result<usize, ResolutionError> {
        if candidates.len() == 1 {
            return Ok(0);
        }
        for (i, candidate) in candidates.iter().enumerate() {
            let beats_all = candidates.iter().enumerate().all(|(j, other)| {
                i == j || more_specific(candidate, other, self.registry) == Specificity::A
            });
            if beats_all {
                return Ok(i);
            }
        }
        Err(ResolutionError::AmbiguousResolution {
            family: family.name.clone(),
            candidates: candidates
                .iter()
                .map(|c| c.decl.signature())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// CheckExplicitSpecialization: a full specialization whose pattern
    /// matches the concrete argument list exactly supplies the definition
    /// without affecting the ranking decision.
    fn full_specialization_for<'f>(
        &self,
        family: &'f Family,
        concrete: &[Argument],
    ) -> Option<&'f Declaration> {
        family.full_specializations().find(|spec| {
            spec.pattern.as_deref().is_some_and(|pattern| {
                pattern.len() == concrete.len()
                    && pattern
                        .iter()
                        .zip(concrete)
                        .all(|(p, a)| p.canonical_hash() == a.to_shape().canonical_hash())
            })
        })
    }

    /// Instantiate a declaration's explicit base construction, eagerly and
    /// through the cache. Circular base chains trip the cache's re-entry
    /// detection.
    fn instantiate_base(
        &self,
        init: &BaseInit,
        binding: &Binding,
    ) -> Result<Arc<Instantiation>, ResolutionError> {
        let ctx = Ctx {
            registry: self.registry,
            mode: BindMode::CallSite,
        };
        let shapes: Vec<TypeExpr> = binder::substitute_list(&init.args, binding, &ctx)
            .map_err(|_| ResolutionError::NoViableCandidate {
                family: init.family.clone(),
            })?;
        let slots: Vec<ArgSlot> = shapes
            .iter()
            .map(|shape| ArgSlot::Concrete(binder::shape_to_argument(shape)))
            .collect();
        self.resolve(&init.family, &slots)
    }
}

/// The fully-deduced concrete argument list that identifies an
/// instantiation under the winning declaration.
///
/// A pattern declaration matches explicit arguments, so the use-site list
/// is the family's argument list as written. On the parameter path the
/// identity is the flattened binding: defaults are filled in, by-value
/// deduction has dropped qualification, and a forwarding reference has
/// collapsed the value category into the deduced shape. Binding details
/// that deduction normalizes away never split the identity.
fn identity_arguments(args: &[ArgSlot], winner: &Candidate<'_>) -> Vec<Argument> {
    if winner.decl.pattern.is_some() {
        args.iter()
            .filter_map(|slot| slot.as_concrete().cloned())
            .collect()
    } else {
        winner.binding.flattened()
    }
}
