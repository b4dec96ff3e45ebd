//! Bidirectional tag registry.
//!
//! Tracks which query keys provide which tags so an invalidation can find
//! every affected cached result without scanning the store.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{QueryKey, Tag};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

#[derive(Default)]
struct Maps {
    tag_to_keys: HashMap<Tag, HashSet<QueryKey>>,
    key_to_tags: HashMap<QueryKey, HashSet<Tag>>,
}

impl Maps {
    fn detach(&mut self, key: &QueryKey) {
        let Some(tags) = self.key_to_tags.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(keys) = self.tag_to_keys.get_mut(&tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_to_keys.remove(&tag);
                }
            }
        }
    }
}

/// Tracks tag → query keys and query key → tags.
///
/// Both directions live behind one lock so a reader never observes a key
/// registered in one map and missing from the other.
#[derive(Default)]
pub struct CacheRegistry {
    maps: RwLock<Maps>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the tags `key` provides, replacing whatever it provided before.
    pub fn register(&self, key: QueryKey, tags: HashSet<Tag>) {
        let mut maps = rw_write(&self.maps, SOURCE, "register");
        maps.detach(&key);
        for tag in &tags {
            maps.tag_to_keys.entry(*tag).or_default().insert(key);
        }
        maps.key_to_tags.insert(key, tags);
    }

    /// Union of the keys providing any of `tags`.
    pub fn keys_for_tags<'a>(&self, tags: impl IntoIterator<Item = &'a Tag>) -> HashSet<QueryKey> {
        let maps = rw_read(&self.maps, SOURCE, "keys_for_tags");
        tags.into_iter()
            .filter_map(|tag| maps.tag_to_keys.get(tag))
            .flatten()
            .copied()
            .collect()
    }

    /// Forgets `key`. Called when its cache entry is pruned.
    pub fn unregister(&self, key: &QueryKey) {
        rw_write(&self.maps, SOURCE, "unregister").detach(key);
    }
}
