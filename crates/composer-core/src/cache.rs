//! Process-wide module cache.
//!
//! Module definitions fetched by one session are reused by every later session
//! that shares the same `Arc<ModuleCache>`. On-chain bytecode for a module is
//! assumed not to change for the life of the process, so entries are never
//! replaced or evicted.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use composer_types::{ModuleDefinition, ModuleIdentifier};
use parking_lot::RwLock;
use tracing::{debug, trace};

/// Thread-safe, first-write-wins store of module definitions.
#[derive(Default)]
pub struct ModuleCache {
    modules: RwLock<HashMap<ModuleIdentifier, Arc<ModuleDefinition>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &ModuleIdentifier) -> Option<Arc<ModuleDefinition>> {
        self.modules.read().get(id).cloned()
    }

    /// Insert a definition unless one is already cached for `id`.
    ///
    /// Returns true only for the first writer. The check and the insert happen
    /// under a single write lock.
    pub fn put(&self, id: ModuleIdentifier, definition: Arc<ModuleDefinition>) -> bool {
        match self.modules.write().entry(id) {
            Entry::Occupied(entry) => {
                trace!(module = %entry.key(), "module already cached");
                false
            }
            Entry::Vacant(entry) => {
                debug!(module = %entry.key(), bytes = definition.bytecode.len(), "cached module");
                entry.insert(definition);
                true
            }
        }
    }

    pub fn contains(&self, id: &ModuleIdentifier) -> bool {
        self.modules.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    /// Cached identifiers, sorted.
    pub fn module_ids(&self) -> Vec<ModuleIdentifier> {
        let mut ids: Vec<ModuleIdentifier> = self.modules.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ModuleIdentifier {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_write_wins() {
        let cache = ModuleCache::new();
        assert!(cache.is_empty());

        let first = Arc::new(ModuleDefinition::new(vec![1]));
        let second = Arc::new(ModuleDefinition::new(vec![2]));

        assert!(cache.put(id("0x1::coin"), first));
        assert!(!cache.put(id("0x1::coin"), second));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&id("0x1::coin")).unwrap().bytecode, vec![1]);
    }

    #[test]
    fn test_keys_are_canonical() {
        let cache = ModuleCache::new();
        cache.put(id("0x1::coin"), Arc::new(ModuleDefinition::new(vec![1])));
        assert!(cache.contains(&id(
            "0x0000000000000000000000000000000000000000000000000000000000000001::coin"
        )));
        assert!(!cache.contains(&id("0x1::aptos_coin")));
    }

    #[test]
    fn test_concurrent_first_writers() {
        let cache = Arc::new(ModuleCache::new());
        let handles: Vec<_> = (0u8..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.put(id("0xcafe::pool"), Arc::new(ModuleDefinition::new(vec![i])))
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_module_ids_sorted() {
        let cache = ModuleCache::new();
        cache.put(id("0x1::string"), Arc::new(ModuleDefinition::new(vec![])));
        cache.put(id("0x1::coin"), Arc::new(ModuleDefinition::new(vec![])));
        let names: Vec<String> = cache.module_ids().iter().map(|m| m.to_string()).collect();
        assert_eq!(names, vec!["0x1::coin", "0x1::string"]);
    }
}
