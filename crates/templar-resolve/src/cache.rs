//! Memoizing instantiation cache.
//!
//! For a given key the factory runs at most once process-wide. Concurrent
//! callers for the same key block until the single result is published and
//! then observe identical `Arc` identity. Re-entry by the building thread
//! itself is a circular instantiation chain and reported eagerly rather
//! than left to deadlock.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use templar_core::{InstanceKey, ResolutionError};

use crate::instance::Instantiation;

enum Slot {
    /// Under construction by the named thread.
    Building(ThreadId),
    Ready(Arc<Instantiation>),
}

/// Exactly-once memoization of realized instantiations.
pub struct InstantiationCache {
    slots: Mutex<FxHashMap<InstanceKey, Slot>>,
    published: Condvar,
}

impl Default for InstantiationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InstantiationCache {
    pub fn new() -> Self {
        InstantiationCache {
            slots: Mutex::new(FxHashMap::default()),
            published: Condvar::new(),
        }
    }

    /// Look up `key`, running `factory` only if no instantiation exists
    /// yet.
    ///
    /// # Errors
    ///
    /// `CircularInstantiation` when the building thread re-requests its own
    /// in-flight key; otherwise whatever `factory` returns. A failed
    /// factory clears the in-flight entry so the failure is not sticky.
    pub fn get_or_create<F>(
        &self,
        key: InstanceKey,
        family: &str,
        factory: F,
    ) -> Result<Arc<Instantiation>, ResolutionError>
    where
        F: FnOnce() -> Result<Instantiation, ResolutionError>,
    {
        let me = thread::current().id();
        {
            let mut slots = self.slots.lock();
            loop {
                match slots.get(&key) {
                    Some(Slot::Ready(instance)) => return Ok(instance.clone()),
                    Some(Slot::Building(owner)) => {
                        if *owner == me {
                            return Err(ResolutionError::CircularInstantiation {
                                family: family.to_string(),
                            });
                        }
                        self.published.wait(&mut slots);
                    }
                    None => {
                        slots.insert(key, Slot::Building(me));
                        break;
                    }
                }
            }
        }

        // The factory runs outside the lock; nested resolutions re-enter
        // get_or_create and hit the Building entry above.
        let built = factory();

        let mut slots = self.slots.lock();
        let result = match built {
            Ok(instance) => {
                let instance = Arc::new(instance);
                slots.insert(key, Slot::Ready(instance.clone()));
                Ok(instance)
            }
            Err(err) => {
                slots.remove(&key);
                Err(err)
            }
        };
        self.published.notify_all();
        result
    }

    /// An already-published instantiation, if any.
    pub fn get(&self, key: InstanceKey) -> Option<Arc<Instantiation>> {
        match self.slots.lock().get(&key) {
            Some(Slot::Ready(instance)) => Some(instance.clone()),
            _ => None,
        }
    }

    /// Number of published instantiations.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|s| matches!(s, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use templar_core::{Binding, BodyId, DeclId, FamilyId};

    fn instance(key: InstanceKey) -> Instantiation {
        Instantiation::new(
            key,
            FamilyId::from_name("f"),
            DeclId(0),
            BodyId(0),
            Binding::new(0),
            None,
        )
    }

    #[test]
    fn factory_runs_once_per_key() {
        let cache = InstantiationCache::new();
        let key = InstanceKey::from_parts(FamilyId::from_name("f"), &[1]);
        let first = cache.get_or_create(key, "f", || Ok(instance(key))).unwrap();
        let second = cache
            .get_or_create(key, "f", || panic!("factory re-ran"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn same_thread_reentry_is_circular() {
        let cache = InstantiationCache::new();
        let key = InstanceKey::from_parts(FamilyId::from_name("f"), &[1]);
        let result = cache.get_or_create(key, "f", || {
            match cache.get_or_create(key, "f", || Ok(instance(key))) {
                Err(e) => Err(e),
                Ok(_) => panic!("nested create must not succeed"),
            }
        });
        assert!(matches!(
            result,
            Err(ResolutionError::CircularInstantiation { family }) if family == "f"
        ));
    }

    #[test]
    fn failed_factory_is_not_sticky() {
        let cache = InstantiationCache::new();
        let key = InstanceKey::from_parts(FamilyId::from_name("f"), &[1]);
        let err = cache.get_or_create(key, "f", || {
            Err(ResolutionError::NoViableCandidate {
                family: "f".to_string(),
            })
        });
        assert!(err.is_err());
        assert!(cache.get(key).is_none());

        let ok = cache.get_or_create(key, "f", || Ok(instance(key)));
        assert!(ok.is_ok());
    }

    #[test]
    fn distinct_keys_are_independent() {
        let cache = InstantiationCache::new();
        let fam = FamilyId::from_name("f");
        let k1 = InstanceKey::from_parts(fam, &[1]);
        let k2 = InstanceKey::from_parts(fam, &[2]);
        let a = cache.get_or_create(k1, "f", || Ok(instance(k1))).unwrap();
        let b = cache.get_or_create(k2, "f", || Ok(instance(k2))).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }
}
