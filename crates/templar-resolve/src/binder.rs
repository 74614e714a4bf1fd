//! Argument binder.
//!
//! Attempts to bind one declaration's parameter list (or specialization
//! pattern) against a use-site argument list. Every failure here is a
//! [`SubstitutionFailure`]: non-fatal, swallowed by the resolver, and only
//! removes the candidate from consideration.
//!
//! # Binding Rules
//!
//! - Binding is positional. Fixed parameters consume one slot each; the
//!   single pack greedily takes the maximal trailing run.
//! - A `Deduce` slot is satisfied only by the parameter's default.
//! - Forwarding parameters preserve the argument's value category and
//!   cv-qualification exactly. Fixed references and by-value parameters
//!   apply their fixed conversion regardless of category: an lvalue
//!   reference requires an lvalue unless const-qualified (adding const is
//!   recorded as a qualification adjustment), an rvalue reference requires
//!   an rvalue, and by-value binding strips qualification.
//! - Dependent names in declared types are resolved against the binding
//!   after deduction (stage two of two-phase lookup); an unknown name after
//!   substitution fails the candidate, not the query.

use templar_core::{
    ArgKind, ArgSlot, Argument, Binding, Bound, ConstValue, Declaration, ParamKind, Parameter,
    Quals, RefKind, SubstitutionFailure, TypeExpr, ValueCategory,
};
use templar_registry::DeclarationRegistry;

/// How strictly the binder checks against the outside world.
///
/// `Synthetic` is used by the specificity comparator, which binds
/// signatures built from synthesized placeholder arguments: category
/// checks, registry lookups, and value typing are skipped there because the
/// placeholders carry none of that information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    CallSite,
    Synthetic,
}

pub(crate) struct Ctx<'a> {
    pub registry: &'a DeclarationRegistry,
    pub mode: BindMode,
}

impl Ctx<'_> {
    fn strict(&self) -> bool {
        self.mode == BindMode::CallSite
    }
}

/// Bind a declaration against a use-site argument list.
///
/// # Errors
///
/// Any [`SubstitutionFailure`]; callers treat these as "candidate does not
/// apply" rather than as errors.
pub fn bind(
    decl: &Declaration,
    args: &[ArgSlot],
    registry: &DeclarationRegistry,
) -> Result<Binding, SubstitutionFailure> {
    bind_mode(
        decl,
        args,
        &Ctx {
            registry,
            mode: BindMode::CallSite,
        },
    )
}

pub(crate) fn bind_mode(
    decl: &Declaration,
    args: &[ArgSlot],
    ctx: &Ctx<'_>,
) -> Result<Binding, SubstitutionFailure> {
    let binding = match &decl.pattern {
        Some(pattern) => bind_pattern(decl, pattern, args, ctx)?,
        None => bind_params(decl, args, ctx)?,
    };
    if !binding.is_complete() {
        return Err(SubstitutionFailure::UnboundParameter);
    }
    Ok(binding)
}

// ==========================================================================
// Parameter-list path (primaries and overloads)
// ==========================================================================

fn bind_params(
    decl: &Declaration,
    args: &[ArgSlot],
    ctx: &Ctx<'_>,
) -> Result<Binding, SubstitutionFailure> {
    let params = &decl.params;
    let mut binding = Binding::new(params.len());
    let pack = decl.pack_index();
    let fixed_end = pack.unwrap_or(params.len());

    if pack.is_none() && args.len() > params.len() {
        return Err(SubstitutionFailure::ArityMismatch);
    }

    for (i, param) in params.iter().take(fixed_end).enumerate() {
        let arg = resolve_slot(param, args.get(i))?;
        bind_one(i, param, &arg, &mut binding, ctx)?;
    }

    if let Some(p) = pack {
        let run = if args.len() > p { &args[p..] } else { &[] };
        let mut elems = Vec::with_capacity(run.len());
        for slot in run {
            let arg = slot
                .as_concrete()
                .ok_or(SubstitutionFailure::UnfilledDeductionSlot)?;
            elems.push(pack_element(p, &params[p], arg, params.len(), ctx)?);
        }
        if !binding.set(p, Bound::Pack(elems)) {
            return Err(SubstitutionFailure::InconsistentDeduction);
        }
        // Parameters after the pack never consume an argument; the pack has
        // absorbed the whole trailing run.
        for (i, param) in params.iter().enumerate().skip(p + 1) {
            let arg = param
                .default
                .clone()
                .ok_or(SubstitutionFailure::NoPackSplit)?;
            bind_one(i, param, &arg, &mut binding, ctx)?;
        }
    }

    Ok(binding)
}

fn resolve_slot(
    param: &Parameter,
    slot: Option<&ArgSlot>,
) -> Result<Argument, SubstitutionFailure> {
    match slot {
        Some(ArgSlot::Concrete(arg)) => Ok(arg.clone()),
        Some(ArgSlot::Deduce) => param
            .default
            .clone()
            .ok_or(SubstitutionFailure::UnfilledDeductionSlot),
        None => param
            .default
            .clone()
            .ok_or(SubstitutionFailure::ArityMismatch),
    }
}

fn bind_one(
    index: usize,
    param: &Parameter,
    arg: &Argument,
    binding: &mut Binding,
    ctx: &Ctx<'_>,
) -> Result<(), SubstitutionFailure> {
    match &param.kind {
        ParamKind::Type { declared: None } => {
            let ArgKind::Type(ty) = &arg.kind else {
                return Err(SubstitutionFailure::KindMismatch);
            };
            // By-value deduction: qualification is stripped and the
            // category normalized.
            set_one(binding, index, Argument::of_type(ty.clone()))
        }
        ParamKind::Type {
            declared: Some(shape),
        } => {
            if !matches!(arg.kind, ArgKind::Type(_)) {
                return Err(SubstitutionFailure::KindMismatch);
            }
            bind_declared_type(shape, arg, binding, ctx)?;
            if binding.get(index).is_none() {
                // Shape referenced only other parameters; the argument
                // itself still fills this slot by value.
                let ArgKind::Type(ty) = &arg.kind else {
                    return Err(SubstitutionFailure::KindMismatch);
                };
                set_one(binding, index, Argument::of_type(ty.clone()))?;
            }
            Ok(())
        }
        ParamKind::NonType { declared } => {
            let ArgKind::Value(value) = &arg.kind else {
                return Err(SubstitutionFailure::KindMismatch);
            };
            let concrete = substitute(declared, binding, ctx)?;
            check_value_type(&concrete, value, ctx)?;
            set_one(binding, index, arg.clone())
        }
        ParamKind::Family { params: inner } => {
            let ArgKind::Family(name) = &arg.kind else {
                return Err(SubstitutionFailure::KindMismatch);
            };
            if ctx.strict() {
                let family = ctx
                    .registry
                    .lookup_family(name.as_str())
                    .ok_or(SubstitutionFailure::KindMismatch)?;
                let primary = family
                    .primary()
                    .ok_or(SubstitutionFailure::KindMismatch)?;
                if primary.params.len() != inner.len() {
                    return Err(SubstitutionFailure::KindMismatch);
                }
            }
            set_one(binding, index, arg.clone())
        }
    }
}

fn set_one(
    binding: &mut Binding,
    index: usize,
    arg: Argument,
) -> Result<(), SubstitutionFailure> {
    if binding.set(index, Bound::One(arg)) {
        Ok(())
    } else {
        Err(SubstitutionFailure::InconsistentDeduction)
    }
}

/// Bind one pack element, producing the per-element bound argument.
fn pack_element(
    pack_index: usize,
    param: &Parameter,
    arg: &Argument,
    arity: usize,
    ctx: &Ctx<'_>,
) -> Result<Argument, SubstitutionFailure> {
    match &param.kind {
        ParamKind::Type { declared: None } => {
            let ArgKind::Type(ty) = &arg.kind else {
                return Err(SubstitutionFailure::KindMismatch);
            };
            Ok(Argument::of_type(ty.clone()))
        }
        ParamKind::Type {
            declared: Some(shape),
        } => {
            if matches!(shape, TypeExpr::Reference(RefKind::Forwarding, _)) {
                return Ok(forward_deduced(arg));
            }
            let mut scratch = Binding::new(arity);
            bind_declared_type(shape, arg, &mut scratch, ctx)?;
            match scratch.get(pack_index) {
                Some(Bound::One(bound)) => Ok(bound.clone()),
                _ => Err(SubstitutionFailure::PatternMismatch),
            }
        }
        ParamKind::NonType { .. } => {
            if !matches!(arg.kind, ArgKind::Value(_)) {
                return Err(SubstitutionFailure::KindMismatch);
            }
            Ok(arg.clone())
        }
        ParamKind::Family { .. } => {
            if !matches!(arg.kind, ArgKind::Family(_)) {
                return Err(SubstitutionFailure::KindMismatch);
            }
            Ok(arg.clone())
        }
    }
}

/// Bind an argument against a parameter's declared shape.
///
/// Top-level references carry the category and qualification rules; below
/// the reference the shape is unified structurally.
fn bind_declared_type(
    shape: &TypeExpr,
    arg: &Argument,
    binding: &mut Binding,
    ctx: &Ctx<'_>,
) -> Result<(), SubstitutionFailure> {
    match shape {
        TypeExpr::Reference(RefKind::Forwarding, inner) => {
            let TypeExpr::Param(j) = &**inner else {
                return Err(SubstitutionFailure::PatternMismatch);
            };
            if binding.set(*j as usize, Bound::One(forward_deduced(arg))) {
                Ok(())
            } else {
                Err(SubstitutionFailure::InconsistentDeduction)
            }
        }
        TypeExpr::Reference(kind, inner) => {
            let referent_const =
                matches!(&**inner, TypeExpr::Qualified(q, _) if q.contains(Quals::CONST));
            if ctx.strict() {
                match kind {
                    RefKind::Lvalue => {
                        if arg.category != ValueCategory::Lvalue && !referent_const {
                            return Err(SubstitutionFailure::CategoryMismatch);
                        }
                    }
                    RefKind::Rvalue => {
                        if arg.category != ValueCategory::Rvalue {
                            return Err(SubstitutionFailure::CategoryMismatch);
                        }
                    }
                    RefKind::Forwarding => unreachable!("handled above"),
                }
            }
            bind_ref_referent(inner, &arg.to_shape(), binding)
        }
        other => {
            // By-value: the argument's own qualification is dropped before
            // matching.
            let ArgKind::Type(ty) = &arg.kind else {
                return Err(SubstitutionFailure::KindMismatch);
            };
            unify(other, ty, binding)
        }
    }
}

/// The deduction a forwarding reference produces for an argument.
///
/// Reference collapsing: an lvalue deduces the parameter as an lvalue
/// reference to its qualified type, an rvalue deduces the bare type, so the
/// argument's category and qualification survive in the deduced identity
/// itself. Lvalue and rvalue calls are therefore distinct instantiations.
fn forward_deduced(arg: &Argument) -> Argument {
    match arg.category {
        ValueCategory::Lvalue => Argument::lvalue(TypeExpr::lvalue_ref(arg.to_shape())),
        ValueCategory::Rvalue => arg.clone(),
    }
}

/// Unify a reference's referent shape, permitting qualification to be
/// added (e.g. binding `const T&` to a plain lvalue) with the addition
/// recorded on the binding.
fn bind_ref_referent(
    inner: &TypeExpr,
    concrete: &TypeExpr,
    binding: &mut Binding,
) -> Result<(), SubstitutionFailure> {
    match inner {
        TypeExpr::Qualified(pq, pinner) => {
            let (cq, cbase) = split_quals(concrete);
            if !(*pq - cq).is_empty() {
                binding.note_qual_adjustment();
            }
            let rest = TypeExpr::qualified(cq - *pq, cbase.clone());
            unify(pinner, &rest, binding)
        }
        _ => unify(inner, concrete, binding),
    }
}

// ==========================================================================
// Pattern path (specializations)
// ==========================================================================

fn bind_pattern(
    decl: &Declaration,
    pattern: &[TypeExpr],
    args: &[ArgSlot],
    ctx: &Ctx<'_>,
) -> Result<Binding, SubstitutionFailure> {
    let arity = decl.params.len();
    let mut binding = Binding::new(arity);
    let pack_pos = pattern
        .iter()
        .position(|e| matches!(e, TypeExpr::PackExpansion(_)));

    match pack_pos {
        None => {
            if args.len() != pattern.len() {
                return Err(SubstitutionFailure::ArityMismatch);
            }
            for (elem, slot) in pattern.iter().zip(args) {
                unify_slot(elem, slot, &mut binding)?;
            }
        }
        Some(k) => {
            // One pack expansion absorbs whatever the fixed elements
            // around it leave over.
            let after = pattern.len() - k - 1;
            if args.len() < k + after {
                return Err(SubstitutionFailure::NoPackSplit);
            }
            let run = args.len() - k - after;
            for (elem, slot) in pattern[..k].iter().zip(&args[..k]) {
                unify_slot(elem, slot, &mut binding)?;
            }

            let TypeExpr::PackExpansion(inner) = &pattern[k] else {
                return Err(SubstitutionFailure::PatternMismatch);
            };
            let pack_param = decl
                .pack_index()
                .ok_or(SubstitutionFailure::PatternMismatch)?;
            let mut elems = Vec::with_capacity(run);
            for slot in &args[k..k + run] {
                let arg = slot
                    .as_concrete()
                    .ok_or(SubstitutionFailure::UnfilledDeductionSlot)?;
                let mut scratch = Binding::new(arity);
                unify(inner, &arg.to_shape(), &mut scratch)?;
                match scratch.get(pack_param) {
                    Some(Bound::One(bound)) => elems.push(bound.clone()),
                    _ => return Err(SubstitutionFailure::PatternMismatch),
                }
                for j in 0..arity {
                    if j == pack_param {
                        continue;
                    }
                    if let Some(other) = scratch.get(j) {
                        if !binding.set(j, other.clone()) {
                            return Err(SubstitutionFailure::InconsistentDeduction);
                        }
                    }
                }
            }
            if !binding.set(pack_param, Bound::Pack(elems)) {
                return Err(SubstitutionFailure::InconsistentDeduction);
            }

            for (elem, slot) in pattern[k + 1..].iter().zip(&args[k + run..]) {
                unify_slot(elem, slot, &mut binding)?;
            }
        }
    }

    // Deduced non-type parameters still have to satisfy their declared
    // types, which may depend on sibling deductions.
    for (i, param) in decl.params.iter().enumerate() {
        if let ParamKind::NonType { declared } = &param.kind {
            if let Some(Bound::One(arg)) = binding.get(i) {
                let ArgKind::Value(value) = &arg.kind else {
                    return Err(SubstitutionFailure::KindMismatch);
                };
                let concrete = substitute(declared, &binding, ctx)?;
                check_value_type(&concrete, value, ctx)?;
            }
        }
    }

    Ok(binding)
}

fn unify_slot(
    elem: &TypeExpr,
    slot: &ArgSlot,
    binding: &mut Binding,
) -> Result<(), SubstitutionFailure> {
    let arg = slot
        .as_concrete()
        .ok_or(SubstitutionFailure::UnfilledDeductionSlot)?;
    unify(elem, &arg.to_shape(), binding)
}

// ==========================================================================
// Structural unification
// ==========================================================================

/// Unify a (possibly dependent) pattern shape against a concrete shape,
/// deducing parameters consistently across repeated occurrences.
///
/// Qualification here is strict: a qualifier the pattern demands must be
/// present on the concrete shape, and the remainder flows into whatever the
/// pattern captures.
fn unify(
    pattern: &TypeExpr,
    concrete: &TypeExpr,
    binding: &mut Binding,
) -> Result<(), SubstitutionFailure> {
    match pattern {
        TypeExpr::Param(j) => {
            set_one(binding, *j as usize, shape_to_argument(concrete))
        }
        TypeExpr::Qualified(pq, pinner) => {
            let (cq, cbase) = split_quals(concrete);
            if !cq.contains(*pq) {
                return Err(SubstitutionFailure::QualificationMismatch);
            }
            unify(pinner, &TypeExpr::qualified(cq - *pq, cbase.clone()), binding)
        }
        TypeExpr::Named(a) => match concrete {
            TypeExpr::Named(b) if a == b => Ok(()),
            _ => Err(SubstitutionFailure::PatternMismatch),
        },
        TypeExpr::Pointer(pinner) => match concrete {
            TypeExpr::Pointer(cinner) => unify(pinner, cinner, binding),
            _ => Err(SubstitutionFailure::PatternMismatch),
        },
        TypeExpr::Reference(pk, pinner) => match concrete {
            TypeExpr::Reference(ck, cinner) if ref_compatible(*pk, *ck) => {
                unify(pinner, cinner, binding)
            }
            _ => Err(SubstitutionFailure::PatternMismatch),
        },
        TypeExpr::Apply {
            family: pf,
            args: pa,
        } => match concrete {
            TypeExpr::Apply {
                family: cf,
                args: ca,
            } if pf == cf && pa.len() == ca.len() => {
                for (p, c) in pa.iter().zip(ca) {
                    unify(p, c, binding)?;
                }
                Ok(())
            }
            _ => Err(SubstitutionFailure::PatternMismatch),
        },
        TypeExpr::FamilyRef(pf) => match concrete {
            TypeExpr::FamilyRef(cf) if pf == cf => Ok(()),
            _ => Err(SubstitutionFailure::PatternMismatch),
        },
        TypeExpr::Value(pv) => match concrete {
            TypeExpr::Value(cv) if pv == cv => Ok(()),
            _ => Err(SubstitutionFailure::ValueMismatch),
        },
        TypeExpr::Dependent { .. } | TypeExpr::PackExpansion(_) => {
            Err(SubstitutionFailure::PatternMismatch)
        }
    }
}

fn ref_compatible(pattern: RefKind, concrete: RefKind) -> bool {
    pattern == concrete
        || (pattern != RefKind::Lvalue && concrete != RefKind::Lvalue)
}

// ==========================================================================
// Substitution
// ==========================================================================

/// Substitute a dependent expression against a binding, producing a
/// concrete shape.
///
/// Dependent names are resolved here (stage two of two-phase lookup): the
/// base parameter's bound type supplies the scope, and the composed name
/// must be known to the registry.
pub(crate) fn substitute(
    expr: &TypeExpr,
    binding: &Binding,
    ctx: &Ctx<'_>,
) -> Result<TypeExpr, SubstitutionFailure> {
    match expr {
        TypeExpr::Param(i) => match binding.get(*i as usize) {
            Some(Bound::One(arg)) => Ok(arg.to_shape()),
            _ => Err(SubstitutionFailure::UnboundParameter),
        },
        TypeExpr::Dependent { base, name } => {
            let Some(Bound::One(arg)) = binding.get(*base as usize) else {
                return Err(SubstitutionFailure::UnboundParameter);
            };
            let shape = arg.to_shape();
            let (_, bare) = split_quals(&shape);
            let TypeExpr::Named(atom) = bare else {
                return Err(SubstitutionFailure::UnknownDependentName(format!(
                    "{bare}::{name}"
                )));
            };
            let composed = format!("{atom}::{name}");
            if ctx.strict() && !ctx.registry.is_known_type(&composed) {
                return Err(SubstitutionFailure::UnknownDependentName(composed));
            }
            Ok(TypeExpr::named(composed))
        }
        TypeExpr::Named(_) | TypeExpr::FamilyRef(_) | TypeExpr::Value(_) => Ok(expr.clone()),
        TypeExpr::Pointer(inner) => Ok(TypeExpr::pointer(substitute(inner, binding, ctx)?)),
        TypeExpr::Reference(kind, inner) => Ok(TypeExpr::Reference(
            *kind,
            Box::new(substitute(inner, binding, ctx)?),
        )),
        TypeExpr::Qualified(quals, inner) => Ok(TypeExpr::qualified(
            *quals,
            substitute(inner, binding, ctx)?,
        )),
        TypeExpr::Apply { family, args } => Ok(TypeExpr::Apply {
            family: family.clone(),
            args: substitute_list(args, binding, ctx)?,
        }),
        // A bare pack expansion is only meaningful inside a list position.
        TypeExpr::PackExpansion(_) => Err(SubstitutionFailure::UnboundParameter),
    }
}

/// Substitute a list of expressions, splicing pack expansions inline.
pub(crate) fn substitute_list(
    exprs: &[TypeExpr],
    binding: &Binding,
    ctx: &Ctx<'_>,
) -> Result<Vec<TypeExpr>, SubstitutionFailure> {
    let mut out = Vec::with_capacity(exprs.len());
    for expr in exprs {
        if let TypeExpr::PackExpansion(inner) = expr {
            let TypeExpr::Param(j) = &**inner else {
                return Err(SubstitutionFailure::UnboundParameter);
            };
            match binding.get(*j as usize) {
                Some(Bound::Pack(elems)) => {
                    out.extend(elems.iter().map(Argument::to_shape));
                }
                _ => return Err(SubstitutionFailure::UnboundParameter),
            }
        } else {
            out.push(substitute(expr, binding, ctx)?);
        }
    }
    Ok(out)
}

fn check_value_type(
    declared: &TypeExpr,
    value: &ConstValue,
    ctx: &Ctx<'_>,
) -> Result<(), SubstitutionFailure> {
    if !ctx.strict() {
        return Ok(());
    }
    let (_, bare) = split_quals(declared);
    match bare {
        TypeExpr::Named(atom) if atom.as_str() == value.type_atom() => Ok(()),
        _ => Err(SubstitutionFailure::ValueMismatch),
    }
}

// ==========================================================================
// Shape helpers
// ==========================================================================

pub(crate) fn split_quals(ty: &TypeExpr) -> (Quals, &TypeExpr) {
    match ty {
        TypeExpr::Qualified(q, inner) => (*q, inner),
        _ => (Quals::empty(), ty),
    }
}

/// Reconstruct an argument from a concrete shape.
pub(crate) fn shape_to_argument(shape: &TypeExpr) -> Argument {
    match shape {
        TypeExpr::Value(v) => Argument::value(v.clone()),
        TypeExpr::FamilyRef(a) => Argument::family(a.as_str()),
        TypeExpr::Qualified(q, inner) => Argument::of_type((**inner).clone()).with_quals(*q),
        other => Argument::of_type(other.clone()),
    }
}
