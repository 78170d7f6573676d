// storage/src/cache.rs

use blockchain_core::Block;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// LRU cache of blocks keyed by block id
pub struct BlockCache {
    cache: Mutex<LruCache<Vec<u8>, Block>>,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, blockid: &[u8]) -> Option<Block> {
        self.cache.lock().get(&blockid.to_vec()).cloned()
    }

    pub fn insert(&self, block: Block) {
        self.cache.lock().insert(block.blockid.clone(), block);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

/// Simple LRU cache implementation
struct LruCache<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Clone + std::hash::Hash + Eq, V> LruCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        if self.map.contains_key(key) {
            self.order.retain(|k| k != key);
            self.order.push_front(key.clone());
            self.map.get(key)
        } else {
            None
        }
    }

    fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        if self.map.len() >= self.capacity && !self.map.contains_key(&key) {
            if let Some(old_key) = self.order.pop_back() {
                self.map.remove(&old_key);
            }
        }

        self.order.retain(|k| k != &key);
        self.order.push_front(key.clone());
        self.map.insert(key, value);
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}
