//! Realized instantiations and their shared storage.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use templar_core::{Binding, BodyId, DeclId, FamilyId, InstanceKey};

/// The single realized definition for one (family, concrete arguments) key.
///
/// Identity-immutable after creation: the cache hands out `Arc`s to one
/// instance per key, and every field except the interior of
/// [`SharedStorage`] is frozen. Destroyed only at cache teardown.
pub struct Instantiation {
    key: InstanceKey,
    family: FamilyId,
    decl: DeclId,
    body: BodyId,
    binding: Binding,
    base: Option<Arc<Instantiation>>,
    storage: SharedStorage,
}

impl Instantiation {
    pub fn new(
        key: InstanceKey,
        family: FamilyId,
        decl: DeclId,
        body: BodyId,
        binding: Binding,
        base: Option<Arc<Instantiation>>,
    ) -> Self {
        Instantiation {
            key,
            family,
            decl,
            body,
            binding,
            base,
            storage: SharedStorage::new(),
        }
    }

    pub fn key(&self) -> InstanceKey {
        self.key
    }

    pub fn family(&self) -> FamilyId {
        self.family
    }

    /// The declaration that supplied the definition. When a full
    /// specialization overrode the ranked winner, this is the
    /// specialization.
    pub fn decl(&self) -> DeclId {
        self.decl
    }

    /// Opaque body handle for the downstream code generator.
    pub fn body(&self) -> BodyId {
        self.body
    }

    /// The parameter-to-argument binding the body is realized under.
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The base-family instantiation this one was explicitly constructed
    /// on, if any.
    pub fn base(&self) -> Option<&Arc<Instantiation>> {
        self.base.as_ref()
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }
}

impl fmt::Debug for Instantiation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instantiation")
            .field("key", &self.key)
            .field("family", &self.family)
            .field("decl", &self.decl)
            .field("has_base", &self.base.is_some())
            .finish()
    }
}

/// Per-instantiation shared "static" storage slots.
///
/// Each named slot is initialized exactly once, on first access; later
/// callers observe the same value. The initializer runs under the storage
/// lock and must not touch the same storage recursively.
pub struct SharedStorage {
    slots: Mutex<FxHashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl SharedStorage {
    fn new() -> Self {
        SharedStorage {
            slots: Mutex::new(FxHashMap::default()),
        }
    }

    /// Get the slot, running `init` only if the slot does not exist yet.
    ///
    /// Returns `None` only when the slot exists with a different type.
    pub fn init_slot<T, F>(&self, name: &str, init: F) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let mut slots = self.slots.lock();
        let entry = slots
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(init()) as Arc<dyn Any + Send + Sync>);
        entry.clone().downcast::<T>().ok()
    }

    /// Get an already-initialized slot.
    pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let slots = self.slots.lock();
        slots.get(name).and_then(|v| v.clone().downcast::<T>().ok())
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}
