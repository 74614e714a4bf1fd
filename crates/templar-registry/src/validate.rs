//! Declaration shape validation.
//!
//! All checks here run at registration time (stage one). Anything that can
//! only be judged against a concrete binding is deferred to the binder
//! (stage two) and fails as a non-fatal substitution failure instead.

use rustc_hash::FxHashSet;

use templar_core::{
    Atom, BaseInit, Declaration, ParamKind, Parameter, RegistrationError, TypeExpr,
};

/// Check pack placement and count for one parameter list.
///
/// At most one pack; the pack must be last unless every later parameter is
/// defaulted or deducible from the given pattern.
pub(crate) fn check_params(
    family: &str,
    params: &[Parameter],
    pattern: Option<&[TypeExpr]>,
) -> Result<(), RegistrationError> {
    let packs = params.iter().filter(|p| p.is_pack).count();
    if packs > 1 {
        return Err(RegistrationError::MultiplePacks {
            family: family.to_string(),
        });
    }

    if let Some(pack_at) = params.iter().position(|p| p.is_pack) {
        let deduced = pattern.map(deduced_positions).unwrap_or_default();
        for (i, p) in params.iter().enumerate().skip(pack_at + 1) {
            if p.default.is_none() && !deduced.contains(&(i as u16)) {
                return Err(RegistrationError::MisplacedPack {
                    family: family.to_string(),
                });
            }
        }
    }

    // Nested-family parameters carry their own lists.
    for p in params {
        if let ParamKind::Family { params: inner } = &p.kind {
            check_params(family, inner, None)?;
        }
    }

    Ok(())
}

/// Checks specific to a partial specialization's argument pattern.
pub(crate) fn check_partial_pattern(
    family: &str,
    params: &[Parameter],
    pattern: &[TypeExpr],
    primary: &Declaration,
) -> Result<(), RegistrationError> {
    if pattern.is_empty() {
        return Err(RegistrationError::EmptyPattern {
            family: family.to_string(),
        });
    }

    let deduced = deduced_positions(pattern);
    let type_deduced = type_deduced_positions(params, pattern);

    // Every parameter of the specialization must be deducible from the
    // pattern (a default is not a substitute here: the parameter would be
    // unconstrained by what the pattern matches).
    for (i, p) in params.iter().enumerate() {
        if !deduced.contains(&(i as u16)) && p.default.is_none() {
            return Err(RegistrationError::NonDeducibleParameter {
                family: family.to_string(),
                position: i,
            });
        }
    }

    // A non-type parameter whose declared type depends on a sibling may only
    // be matched if every parameter that declared type references is itself
    // deduced from a type position; otherwise the dependency is exactly what
    // would have to be matched.
    for (i, p) in params.iter().enumerate() {
        let ParamKind::NonType { declared } = &p.kind else {
            continue;
        };
        if !declared.is_dependent() || !deduced.contains(&(i as u16)) {
            continue;
        }
        let mut bad = false;
        declared.visit_params(&mut |k| {
            if !type_deduced.contains(&k) {
                bad = true;
            }
        });
        if bad {
            return Err(RegistrationError::DependentNonTypePattern {
                family: family.to_string(),
                position: i,
            });
        }
    }

    if restates_primary(params, pattern, primary) {
        return Err(RegistrationError::PatternMatchesPrimary {
            family: family.to_string(),
        });
    }

    Ok(())
}

/// Whether a pattern merely restates the primary's parameter list under new
/// names: element *i* is exactly `$i` (or `$i...` for a pack) and the
/// specialization's parameters mirror the primary's kinds and packness.
fn restates_primary(params: &[Parameter], pattern: &[TypeExpr], primary: &Declaration) -> bool {
    if pattern.len() != params.len() || params.len() != primary.params.len() {
        return false;
    }
    let identity = pattern.iter().enumerate().all(|(i, e)| match e {
        TypeExpr::Param(p) => *p as usize == i,
        TypeExpr::PackExpansion(inner) => {
            matches!(**inner, TypeExpr::Param(p) if p as usize == i)
        }
        _ => false,
    });
    if !identity {
        return false;
    }
    params.iter().zip(&primary.params).all(|(a, b)| {
        a.is_pack == b.is_pack && param_kind_mirrors(&a.kind, &b.kind)
    })
}

fn param_kind_mirrors(a: &ParamKind, b: &ParamKind) -> bool {
    match (a, b) {
        (ParamKind::Type { .. }, ParamKind::Type { .. }) => true,
        (ParamKind::NonType { .. }, ParamKind::NonType { .. }) => true,
        (ParamKind::Family { params: x }, ParamKind::Family { params: y }) => x.len() == y.len(),
        _ => false,
    }
}

/// Parameter positions referenced anywhere in a pattern.
fn deduced_positions(pattern: &[TypeExpr]) -> FxHashSet<u16> {
    let mut set = FxHashSet::default();
    for e in pattern {
        e.visit_params(&mut |i| {
            set.insert(i);
        });
    }
    set
}

/// Parameter positions deduced from type positions of a pattern, i.e.
/// occurrences that deduce a type or family parameter rather than a value.
fn type_deduced_positions(params: &[Parameter], pattern: &[TypeExpr]) -> FxHashSet<u16> {
    let mut set = FxHashSet::default();
    for e in pattern {
        e.visit_params(&mut |i| {
            let is_value = params
                .get(i as usize)
                .is_some_and(|p| matches!(p.kind, ParamKind::NonType { .. }));
            if !is_value {
                set.insert(i);
            }
        });
    }
    set
}

/// Every parameter reference in declared types, defaults, the pattern, and
/// the base initializer must name a position inside the declaration's own
/// parameter list. A dangling `$i` would otherwise surface only as a failed
/// deduction at query time.
pub(crate) fn check_param_refs(
    family: &str,
    params: &[Parameter],
    pattern: Option<&[TypeExpr]>,
    base: Option<&BaseInit>,
) -> Result<(), RegistrationError> {
    let arity = params.len() as u16;
    let mut dangling: Option<u16> = None;
    let mut check = |expr: &TypeExpr| {
        expr.visit_params(&mut |i| {
            if i >= arity && dangling.is_none() {
                dangling = Some(i);
            }
        });
    };

    for p in params {
        if let Some(declared) = p.declared() {
            check(declared);
        }
        if let Some(default) = &p.default {
            check(&default.to_shape());
        }
    }
    for e in pattern.into_iter().flatten() {
        check(e);
    }
    for e in base.map(|b| b.args.as_slice()).into_iter().flatten() {
        check(e);
    }

    // Nested-family parameter lists reference their own positions.
    for p in params {
        if let ParamKind::Family { params: inner } = &p.kind {
            check_param_refs(family, inner, None, None)?;
        }
    }

    match dangling {
        Some(index) => Err(RegistrationError::ParameterOutOfRange {
            family: family.to_string(),
            index,
        }),
        None => Ok(()),
    }
}

/// Stage-one name validation: every concrete named atom in declared types,
/// patterns, defaults, and base initializer arguments must already be a
/// known type. Dependent names are deferred to stage two; family references
/// are resolved at query time (forward references between families are
/// allowed).
pub(crate) fn check_stage1_names(
    known: &FxHashSet<Atom>,
    params: &[Parameter],
    pattern: Option<&[TypeExpr]>,
    base: Option<&BaseInit>,
) -> Result<(), RegistrationError> {
    let mut unknown: Option<Atom> = None;
    let mut check = |atom: &Atom| {
        if unknown.is_none() && !known.contains(atom) {
            unknown = Some(atom.clone());
        }
    };

    for p in params {
        if let Some(declared) = p.declared() {
            declared.visit_named(&mut check);
        }
        if let Some(default) = &p.default {
            default.to_shape().visit_named(&mut check);
        }
        if let ParamKind::Family { params: inner } = &p.kind {
            for q in inner {
                if let Some(declared) = q.declared() {
                    declared.visit_named(&mut check);
                }
            }
        }
    }
    for e in pattern.into_iter().flatten() {
        e.visit_named(&mut check);
    }
    for e in base.map(|b| b.args.as_slice()).into_iter().flatten() {
        e.visit_named(&mut check);
    }

    match unknown {
        Some(atom) => Err(RegistrationError::UnknownName {
            name: atom.as_str().to_string(),
        }),
        None => Ok(()),
    }
}

/// Reject a second default for the same parameter position within one scope
/// of one family.
pub(crate) fn check_duplicate_defaults(
    family: &str,
    existing: &[Declaration],
    params: &[Parameter],
    scope: templar_core::ScopeId,
) -> Result<(), RegistrationError> {
    for (position, p) in params.iter().enumerate() {
        if p.default.is_none() {
            continue;
        }
        let clash = existing.iter().any(|d| {
            d.scope == scope
                && d.params
                    .get(position)
                    .is_some_and(|q| q.default.is_some())
        });
        if clash {
            return Err(RegistrationError::DuplicateDefault {
                family: family.to_string(),
                position,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use templar_core::{Argument, BodyId, DeclId, DeclKind, FamilyId, ScopeId};

    fn primary(params: Vec<Parameter>) -> Declaration {
        Declaration {
            id: DeclId(0),
            kind: DeclKind::Primary,
            family: FamilyId::from_name("f"),
            params,
            pattern: None,
            body: BodyId(0),
            scope: ScopeId::default(),
            base: None,
        }
    }

    #[test]
    fn two_packs_rejected() {
        let params = vec![Parameter::ty().pack(), Parameter::ty().pack()];
        assert_eq!(
            check_params("f", &params, None),
            Err(RegistrationError::MultiplePacks {
                family: "f".to_string()
            })
        );
    }

    #[test]
    fn pack_followed_by_non_defaulted_rejected() {
        let params = vec![Parameter::ty().pack(), Parameter::ty()];
        assert!(matches!(
            check_params("f", &params, None),
            Err(RegistrationError::MisplacedPack { .. })
        ));
    }

    #[test]
    fn pack_followed_by_defaulted_ok() {
        let params = vec![
            Parameter::ty().pack(),
            Parameter::ty().with_default(Argument::of_type(TypeExpr::named("int"))),
        ];
        assert!(check_params("f", &params, None).is_ok());
    }

    #[test]
    fn pack_followed_by_deducible_ok() {
        // Pattern deduces $1, so the trailing fixed parameter is fine.
        let params = vec![Parameter::ty().pack(), Parameter::ty()];
        let pattern = vec![
            TypeExpr::pack(TypeExpr::param(0)),
            TypeExpr::pointer(TypeExpr::param(1)),
        ];
        assert!(check_params("f", &params, Some(&pattern)).is_ok());
    }

    #[test]
    fn non_deducible_parameter_rejected() {
        let prim = primary(vec![Parameter::ty(), Parameter::ty()]);
        let params = vec![Parameter::ty(), Parameter::ty()];
        // Pattern only mentions $0.
        let pattern = vec![
            TypeExpr::pointer(TypeExpr::param(0)),
            TypeExpr::named("int"),
        ];
        assert_eq!(
            check_partial_pattern("f", &params, &pattern, &prim),
            Err(RegistrationError::NonDeducibleParameter {
                family: "f".to_string(),
                position: 1
            })
        );
    }

    #[test]
    fn dependent_non_type_in_matched_position_rejected() {
        let prim = primary(vec![Parameter::ty(), Parameter::ty()]);
        // $1 is a non-type parameter whose declared type is $0, and $0 is
        // itself only deduced through $1's value position.
        let params = vec![
            Parameter::ty(),
            Parameter::non_type(TypeExpr::param(0)),
        ];
        let pattern = vec![TypeExpr::named("int"), TypeExpr::param(1)];
        assert!(matches!(
            check_partial_pattern("f", &params, &pattern, &prim),
            Err(RegistrationError::DependentNonTypePattern { position: 1, .. })
        ));
    }

    #[test]
    fn dependent_non_type_with_type_deduced_base_ok() {
        let prim = primary(vec![Parameter::ty(), Parameter::ty()]);
        // $0 is deduced from a type position ($0*), so matching $1 is fine.
        let params = vec![
            Parameter::ty(),
            Parameter::non_type(TypeExpr::param(0)),
        ];
        let pattern = vec![TypeExpr::pointer(TypeExpr::param(0)), TypeExpr::param(1)];
        assert!(check_partial_pattern("f", &params, &pattern, &prim).is_ok());
    }

    #[test]
    fn renamed_identity_pattern_rejected() {
        let prim = primary(vec![Parameter::ty(), Parameter::ty()]);
        let params = vec![Parameter::ty(), Parameter::ty()];
        let pattern = vec![TypeExpr::param(0), TypeExpr::param(1)];
        assert_eq!(
            check_partial_pattern("f", &params, &pattern, &prim),
            Err(RegistrationError::PatternMatchesPrimary {
                family: "f".to_string()
            })
        );
    }

    #[test]
    fn narrowing_pattern_accepted() {
        let prim = primary(vec![Parameter::ty(), Parameter::ty()]);
        let params = vec![Parameter::ty(), Parameter::ty()];
        let pattern = vec![TypeExpr::param(0), TypeExpr::pointer(TypeExpr::param(1))];
        assert!(check_partial_pattern("f", &params, &pattern, &prim).is_ok());
    }

    #[test]
    fn dangling_parameter_reference_rejected() {
        let params = vec![Parameter::ty_declared(TypeExpr::param(7))];
        assert_eq!(
            check_param_refs("f", &params, None, None),
            Err(RegistrationError::ParameterOutOfRange {
                family: "f".to_string(),
                index: 7
            })
        );
    }

    #[test]
    fn base_initializer_parameter_reference_bounds_checked() {
        let params = vec![Parameter::ty()];
        let base = BaseInit::new("b", vec![TypeExpr::param(3)]);
        assert!(matches!(
            check_param_refs("f", &params, None, Some(&base)),
            Err(RegistrationError::ParameterOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn stage1_rejects_unknown_atom() {
        let mut known = FxHashSet::default();
        known.insert(Atom::new("int"));
        let params = vec![Parameter::ty_declared(TypeExpr::pointer(
            TypeExpr::named("widget"),
        ))];
        assert_eq!(
            check_stage1_names(&known, &params, None, None),
            Err(RegistrationError::UnknownName {
                name: "widget".to_string()
            })
        );
    }

    #[test]
    fn stage1_skips_dependent_names() {
        let known = FxHashSet::default();
        // T::iterator is dependent; nothing to validate until substitution.
        let params = vec![
            Parameter::ty(),
            Parameter::ty_declared(TypeExpr::dependent(0, "iterator")),
        ];
        assert!(check_stage1_names(&known, &params, None, None).is_ok());
    }

    #[test]
    fn duplicate_default_same_scope_rejected() {
        let existing = vec![Declaration {
            params: vec![
                Parameter::ty(),
                Parameter::ty().with_default(Argument::of_type(TypeExpr::named("int"))),
            ],
            ..primary(vec![])
        }];
        let params = vec![
            Parameter::ty(),
            Parameter::ty().with_default(Argument::of_type(TypeExpr::named("double"))),
        ];
        assert_eq!(
            check_duplicate_defaults("f", &existing, &params, ScopeId::default()),
            Err(RegistrationError::DuplicateDefault {
                family: "f".to_string(),
                position: 1
            })
        );
    }

    #[test]
    fn duplicate_default_other_scope_ok() {
        let existing = vec![Declaration {
            params: vec![Parameter::ty().with_default(Argument::of_type(TypeExpr::named("int")))],
            ..primary(vec![])
        }];
        let params =
            vec![Parameter::ty().with_default(Argument::of_type(TypeExpr::named("int")))];
        assert!(check_duplicate_defaults("f", &existing, &params, ScopeId(7)).is_ok());
    }
}
