//! Parameter-to-argument bindings.

use crate::argument::Argument;

/// What one parameter is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    /// A single argument.
    One(Argument),
    /// A pack bound to a (possibly empty) sub-sequence of arguments.
    Pack(Vec<Argument>),
}

/// The concrete parameter-to-argument assignment produced by the binder.
///
/// Slots are indexed by parameter position. The bound arguments carry the
/// value-category and cv metadata that forwarding parameters preserve; the
/// binding additionally counts the qualification adjustments (e.g. adding
/// `const` to bind a reference) that were needed, which the specificity
/// comparator uses as a tie-break.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    slots: Vec<Option<Bound>>,
    qual_adjustments: u32,
}

impl Binding {
    pub fn new(arity: usize) -> Self {
        Binding {
            slots: vec![None; arity],
            qual_adjustments: 0,
        }
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&Bound> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Bind parameter `index`, checking consistency against any earlier
    /// deduction for the same parameter. Two deductions agree when their
    /// canonical forms agree; value category is not part of canonical
    /// identity, so the first occurrence's category is kept.
    ///
    /// Returns `false` on a conflicting deduction or an index outside the
    /// parameter list.
    pub fn set(&mut self, index: usize, bound: Bound) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        match slot {
            None => {
                *slot = Some(bound);
                true
            }
            Some(existing) => bounds_agree(existing, &bound),
        }
    }

    /// Record that binding required a qualification adjustment.
    pub fn note_qual_adjustment(&mut self) {
        self.qual_adjustments += 1;
    }

    pub fn qual_adjustments(&self) -> u32 {
        self.qual_adjustments
    }

    /// Whether every parameter is bound.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Indices of parameters that are still unbound.
    pub fn unbound(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
    }

    /// The fully-deduced concrete argument list in parameter order, with
    /// pack elements flattened inline. This is what keys the instantiation
    /// cache.
    pub fn flattened(&self) -> Vec<Argument> {
        let mut out = Vec::with_capacity(self.slots.len());
        for slot in self.slots.iter().flatten() {
            match slot {
                Bound::One(arg) => out.push(arg.clone()),
                Bound::Pack(args) => out.extend(args.iter().cloned()),
            }
        }
        out
    }
}

fn bounds_agree(a: &Bound, b: &Bound) -> bool {
    match (a, b) {
        (Bound::One(x), Bound::One(y)) => x.canonical_hash() == y.canonical_hash(),
        (Bound::Pack(xs), Bound::Pack(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| x.canonical_hash() == y.canonical_hash())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quals::Quals;
    use crate::ty::TypeExpr;

    fn int_arg() -> Argument {
        Argument::of_type(TypeExpr::named("int"))
    }

    #[test]
    fn set_and_complete() {
        let mut b = Binding::new(2);
        assert!(!b.is_complete());
        assert!(b.set(0, Bound::One(int_arg())));
        assert!(b.set(1, Bound::Pack(vec![])));
        assert!(b.is_complete());
        assert_eq!(b.unbound().count(), 0);
    }

    #[test]
    fn repeated_consistent_deduction_is_kept() {
        let mut b = Binding::new(1);
        assert!(b.set(0, Bound::One(int_arg())));
        // Same type, different category: canonical identity agrees.
        assert!(b.set(0, Bound::One(Argument::lvalue(TypeExpr::named("int")))));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut b = Binding::new(1);
        assert!(!b.set(7, Bound::One(int_arg())));
        assert!(b.set(0, Bound::One(int_arg())));
    }

    #[test]
    fn conflicting_deduction_is_rejected() {
        let mut b = Binding::new(1);
        assert!(b.set(0, Bound::One(int_arg())));
        assert!(!b.set(0, Bound::One(Argument::of_type(TypeExpr::named("double")))));
        assert!(!b.set(
            0,
            Bound::One(int_arg().with_quals(Quals::CONST))
        ));
    }

    #[test]
    fn flattened_inlines_packs() {
        let mut b = Binding::new(2);
        b.set(0, Bound::One(int_arg()));
        b.set(
            1,
            Bound::Pack(vec![
                Argument::of_type(TypeExpr::named("double")),
                Argument::of_type(TypeExpr::named("bool")),
            ]),
        );
        let flat = b.flattened();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[2], Argument::of_type(TypeExpr::named("bool")));
    }

    #[test]
    fn qual_adjustments_accumulate() {
        let mut b = Binding::new(0);
        assert_eq!(b.qual_adjustments(), 0);
        b.note_qual_adjustment();
        b.note_qual_adjustment();
        assert_eq!(b.qual_adjustments(), 2);
    }
}
