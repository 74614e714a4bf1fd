//! Specificity comparator.
//!
//! Ranks two viable candidates by partial ordering: synthesize a unique,
//! otherwise-unused argument for every parameter of each side, substitute
//! to obtain that side's concrete signature, then cross-bind. A candidate
//! whose synthesized signature the other side can bind, while the reverse
//! fails, is the more specific one (it accepts a strict subset of what the
//! other accepts).
//!
//! When cross-binding cannot separate the two, tie-breaks apply in order:
//! qualification-adjustment count at the call, fixed reference over
//! forwarding at the same position, and a trailing pack losing to a
//! pack-free rival.

use templar_core::{
    ArgSlot, Argument, Binding, Bound, ConstValue, Declaration, ParamKind, Parameter, RefKind,
    TypeExpr, ValueCategory,
};
use templar_registry::DeclarationRegistry;

use crate::binder::{
    BindMode, Ctx, bind_mode, shape_to_argument, split_quals, substitute, substitute_list,
};

/// Outcome of comparing two candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specificity {
    /// The first candidate is strictly more specific.
    A,
    /// The second candidate is strictly more specific.
    B,
    /// Equally specific; ambiguous if both remain top-ranked.
    Neither,
}

/// One viable (declaration, binding) pair during a resolution.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub decl: &'a Declaration,
    pub binding: Binding,
}

/// Compare two viable candidates for the same family.
pub fn more_specific(
    a: &Candidate<'_>,
    b: &Candidate<'_>,
    registry: &DeclarationRegistry,
) -> Specificity {
    let ctx = Ctx {
        registry,
        mode: BindMode::Synthetic,
    };
    let a_sig = synthesize_signature(a.decl, "a", registry);
    let b_sig = synthesize_signature(b.decl, "b", registry);

    let b_accepts_a = a_sig
        .as_deref()
        .is_some_and(|sig| bind_mode(b.decl, sig, &ctx).is_ok());
    let a_accepts_b = b_sig
        .as_deref()
        .is_some_and(|sig| bind_mode(a.decl, sig, &ctx).is_ok());

    match (b_accepts_a, a_accepts_b) {
        // A's signatures are a strict subset of what B accepts.
        (true, false) => Specificity::A,
        (false, true) => Specificity::B,
        _ => tie_break(a, b),
    }
}

/// Build a declaration's concrete signature from synthesized placeholder
/// arguments. Pack parameters synthesize empty; tie-break (c) separates
/// them.
fn synthesize_signature(
    decl: &Declaration,
    tag: &str,
    registry: &DeclarationRegistry,
) -> Option<Vec<ArgSlot>> {
    let arity = decl.params.len();
    let mut scratch = Binding::new(arity);
    for (i, param) in decl.params.iter().enumerate() {
        let bound = if param.is_pack {
            Bound::Pack(Vec::new())
        } else {
            Bound::One(synth_argument(param, tag, i))
        };
        scratch.set(i, bound);
    }

    let ctx = Ctx {
        registry,
        mode: BindMode::Synthetic,
    };
    let mut out = Vec::new();
    match &decl.pattern {
        Some(pattern) => {
            for shape in substitute_list(pattern, &scratch, &ctx).ok()? {
                out.push(ArgSlot::Concrete(signature_argument(&shape)));
            }
        }
        None => {
            for (i, param) in decl.params.iter().enumerate() {
                if param.is_pack {
                    continue;
                }
                match &param.kind {
                    ParamKind::Type {
                        declared: Some(shape),
                    } => {
                        let concrete = substitute(shape, &scratch, &ctx).ok()?;
                        out.push(ArgSlot::Concrete(signature_argument(&concrete)));
                    }
                    _ => {
                        if let Some(Bound::One(arg)) = scratch.get(i) {
                            out.push(ArgSlot::Concrete(arg.clone()));
                        }
                    }
                }
            }
        }
    }
    Some(out)
}

fn synth_argument(param: &Parameter, tag: &str, index: usize) -> Argument {
    match &param.kind {
        ParamKind::Type { .. } => {
            Argument::of_type(TypeExpr::named(format!("__synth_{tag}{index}")))
        }
        ParamKind::NonType { declared } => Argument::value(synth_value(declared, index)),
        ParamKind::Family { .. } => Argument::family(format!("__synth_fam_{tag}{index}")),
    }
}

fn synth_value(declared: &TypeExpr, index: usize) -> ConstValue {
    let (_, bare) = split_quals(declared);
    match bare {
        TypeExpr::Named(atom) => match atom.as_str() {
            "bool" => ConstValue::Bool(true),
            "string" => ConstValue::Str(format!("__synth_{index}").into()),
            _ => ConstValue::Int(1_000 + index as i64),
        },
        _ => ConstValue::Int(1_000 + index as i64),
    }
}

/// Turn a substituted signature position into a use-site argument. A
/// top-level reference is stripped: the signature carries the referent with
/// the matching value category.
fn signature_argument(shape: &TypeExpr) -> Argument {
    match shape {
        TypeExpr::Reference(kind, inner) => {
            let mut arg = shape_to_argument(inner);
            arg.category = match kind {
                RefKind::Lvalue => ValueCategory::Lvalue,
                RefKind::Rvalue | RefKind::Forwarding => ValueCategory::Rvalue,
            };
            arg
        }
        _ => shape_to_argument(shape),
    }
}

// ==========================================================================
// Tie-breaks
// ==========================================================================

fn tie_break(a: &Candidate<'_>, b: &Candidate<'_>) -> Specificity {
    // (a) a candidate needing qualification adjustment to match the call
    // loses to one needing none.
    let (qa, qb) = (a.binding.qual_adjustments(), b.binding.qual_adjustments());
    if qa != qb {
        return if qa < qb { Specificity::A } else { Specificity::B };
    }

    // (b) fixed reference beats forwarding at the same position.
    let shapes_a = position_shapes(a.decl);
    let shapes_b = position_shapes(b.decl);
    let (mut favors_a, mut favors_b) = (0usize, 0usize);
    for (sa, sb) in shapes_a.iter().zip(&shapes_b) {
        match (ref_flavor(*sa), ref_flavor(*sb)) {
            (RefFlavor::Fixed, RefFlavor::Forwarding) => favors_a += 1,
            (RefFlavor::Forwarding, RefFlavor::Fixed) => favors_b += 1,
            _ => {}
        }
    }
    if favors_a > 0 && favors_b == 0 {
        return Specificity::A;
    }
    if favors_b > 0 && favors_a == 0 {
        return Specificity::B;
    }

    // (c) a trailing pack loses to an otherwise-equal pack-free rival.
    let (pa, pb) = (trailing_pack(a.decl), trailing_pack(b.decl));
    if pa != pb {
        return if pa { Specificity::B } else { Specificity::A };
    }

    Specificity::Neither
}

#[derive(Clone, Copy, PartialEq)]
enum RefFlavor {
    Fixed,
    Forwarding,
    None,
}

fn position_shapes(decl: &Declaration) -> Vec<Option<&TypeExpr>> {
    match &decl.pattern {
        Some(pattern) => pattern.iter().map(Some).collect(),
        None => decl.params.iter().map(Parameter::declared).collect(),
    }
}

fn ref_flavor(shape: Option<&TypeExpr>) -> RefFlavor {
    match shape {
        Some(TypeExpr::Reference(RefKind::Forwarding, _)) => RefFlavor::Forwarding,
        Some(TypeExpr::Reference(_, _)) => RefFlavor::Fixed,
        _ => RefFlavor::None,
    }
}

fn trailing_pack(decl: &Declaration) -> bool {
    match &decl.pattern {
        Some(pattern) => matches!(pattern.last(), Some(TypeExpr::PackExpansion(_))),
        None => decl.has_trailing_pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use templar_core::{BodyId, DeclId, DeclKind, FamilyId, ScopeId};

    fn decl(params: Vec<Parameter>, pattern: Option<Vec<TypeExpr>>) -> Declaration {
        Declaration {
            id: DeclId(0),
            kind: if pattern.is_some() {
                DeclKind::PartialSpecialization
            } else {
                DeclKind::Primary
            },
            family: FamilyId::from_name("f"),
            params,
            pattern,
            body: BodyId(0),
            scope: ScopeId::default(),
            base: None,
        }
    }

    fn candidate(decl: &Declaration) -> Candidate<'_> {
        Candidate {
            decl,
            binding: Binding::new(decl.params.len()),
        }
    }

    #[test]
    fn pointer_pattern_beats_primary() {
        let registry = DeclarationRegistry::new();
        let primary = decl(vec![Parameter::ty(), Parameter::ty()], None);
        let partial = decl(
            vec![Parameter::ty(), Parameter::ty()],
            Some(vec![
                TypeExpr::param(0),
                TypeExpr::pointer(TypeExpr::param(1)),
            ]),
        );
        assert_eq!(
            more_specific(&candidate(&partial), &candidate(&primary), &registry),
            Specificity::A
        );
        assert_eq!(
            more_specific(&candidate(&primary), &candidate(&partial), &registry),
            Specificity::B
        );
    }

    #[test]
    fn specificity_is_transitive() {
        let registry = DeclarationRegistry::new();
        let loose = decl(vec![Parameter::ty()], None);
        let mid = decl(
            vec![Parameter::ty()],
            Some(vec![TypeExpr::pointer(TypeExpr::param(0))]),
        );
        let tight = decl(
            vec![Parameter::ty()],
            Some(vec![TypeExpr::pointer(TypeExpr::pointer(TypeExpr::param(
                0,
            )))]),
        );
        assert_eq!(
            more_specific(&candidate(&tight), &candidate(&mid), &registry),
            Specificity::A
        );
        assert_eq!(
            more_specific(&candidate(&mid), &candidate(&loose), &registry),
            Specificity::A
        );
        assert_eq!(
            more_specific(&candidate(&tight), &candidate(&loose), &registry),
            Specificity::A
        );
    }

    #[test]
    fn identical_lists_are_neither() {
        let registry = DeclarationRegistry::new();
        let x = decl(vec![Parameter::ty()], None);
        let y = decl(vec![Parameter::ty()], None);
        assert_eq!(
            more_specific(&candidate(&x), &candidate(&y), &registry),
            Specificity::Neither
        );
    }

    #[test]
    fn pack_free_wins_over_trailing_pack() {
        let registry = DeclarationRegistry::new();
        let single = decl(vec![Parameter::ty()], None);
        let variadic = decl(vec![Parameter::ty(), Parameter::ty().pack()], None);
        assert_eq!(
            more_specific(&candidate(&single), &candidate(&variadic), &registry),
            Specificity::A
        );
        assert_eq!(
            more_specific(&candidate(&variadic), &candidate(&single), &registry),
            Specificity::B
        );
    }

    #[test]
    fn fixed_reference_beats_forwarding() {
        let registry = DeclarationRegistry::new();
        let fixed = decl(
            vec![Parameter::ty_declared(TypeExpr::lvalue_ref(
                TypeExpr::param(0),
            ))],
            None,
        );
        let forwarding = decl(
            vec![Parameter::ty_declared(TypeExpr::forwarding(0))],
            None,
        );
        assert_eq!(
            more_specific(&candidate(&fixed), &candidate(&forwarding), &registry),
            Specificity::A
        );
    }

    #[test]
    fn qualification_adjustment_loses() {
        let registry = DeclarationRegistry::new();
        let x = decl(vec![Parameter::ty()], None);
        let y = decl(vec![Parameter::ty()], None);
        let clean = candidate(&x);
        let mut adjusted = candidate(&y);
        adjusted.binding.note_qual_adjustment();
        assert_eq!(more_specific(&clean, &adjusted, &registry), Specificity::A);
        assert_eq!(more_specific(&adjusted, &clean, &registry), Specificity::B);
    }
}
