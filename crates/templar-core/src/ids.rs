//! Deterministic hash-based identity for families and instantiations.
//!
//! Families and instantiation keys are identified by 64-bit hashes computed
//! from names and canonical argument forms rather than sequential ids. The
//! same family name always produces the same [`FamilyId`], so a declaration
//! can reference a family (e.g. in a nested pattern) before that family has
//! been registered.
//!
//! Declarations and scopes use small sequential ids instead: declaration
//! order within a family is meaningful as a tie-break of last resort, and
//! hashing would throw that ordering away.

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-mixing constants for hash computation.
///
/// Keeps hashes of different entity kinds disjoint even when they share a
/// textual name (a family called "int" must not collide with the instance
/// key of some other family).
mod hash_constants {
    /// Domain marker for family name hashes.
    pub const FAMILY: u64 = 0x6d1f9c3e8b2a4705;

    /// Domain marker for instantiation keys.
    pub const INSTANCE: u64 = 0x41e8a6c2f3950d7b;

    /// Separator mixed between argument hashes so that argument order and
    /// argument boundaries both matter.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
}

/// Identity of one declaration family.
///
/// Computed deterministically from the family name: same name, same id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct FamilyId(pub u64);

impl FamilyId {
    /// Create a family id from the family's logical name.
    pub fn from_name(name: &str) -> Self {
        FamilyId(xxh64(name.as_bytes(), hash_constants::FAMILY))
    }
}

impl fmt::Debug for FamilyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FamilyId({:#018x})", self.0)
    }
}

/// Memoization key of one instantiation: (family root, canonical concrete
/// arguments).
///
/// Two use sites that deduce the same concrete argument list for the same
/// family produce the same key and therefore share one instantiation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct InstanceKey(pub u64);

impl InstanceKey {
    /// Build a key from a family root and the canonical hashes of its
    /// fully-concrete arguments, in order.
    pub fn from_parts(family: FamilyId, arg_hashes: &[u64]) -> Self {
        let mut acc = family.0 ^ hash_constants::INSTANCE;
        for (i, h) in arg_hashes.iter().enumerate() {
            acc = acc
                .rotate_left(17)
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(h.wrapping_add(i as u64));
        }
        InstanceKey(xxh64(&acc.to_le_bytes(), hash_constants::INSTANCE))
    }
}

impl fmt::Debug for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceKey({:#018x})", self.0)
    }
}

/// Registry-assigned declaration id, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DeclId(pub u32);

/// Opaque id of the scope owning a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct ScopeId(pub u32);

/// Opaque reference to a declaration body held by the front end.
///
/// The engine never inspects bodies; it only hands them to the downstream
/// code generator together with the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct BodyId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_id_is_deterministic() {
        assert_eq!(FamilyId::from_name("vector"), FamilyId::from_name("vector"));
        assert_ne!(FamilyId::from_name("vector"), FamilyId::from_name("list"));
    }

    #[test]
    fn instance_key_depends_on_family() {
        let a = InstanceKey::from_parts(FamilyId::from_name("f"), &[1, 2]);
        let b = InstanceKey::from_parts(FamilyId::from_name("g"), &[1, 2]);
        assert_ne!(a, b);
    }

    #[test]
    fn instance_key_depends_on_argument_order() {
        let fam = FamilyId::from_name("pair");
        let ab = InstanceKey::from_parts(fam, &[1, 2]);
        let ba = InstanceKey::from_parts(fam, &[2, 1]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn instance_key_empty_args_distinct_from_one_arg() {
        let fam = FamilyId::from_name("f");
        assert_ne!(
            InstanceKey::from_parts(fam, &[]),
            InstanceKey::from_parts(fam, &[0])
        );
    }
}
