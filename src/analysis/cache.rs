use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{CacheKey, RawRecord};

/// Memoizes fetched record sets by requested year and month
#[derive(Debug)]
pub struct CacheManager {
    cache: HashMap<CacheKey, Arc<Vec<RawRecord>>>,
}

impl CacheManager {
    /// Create a new cache manager
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Store a record set in the cache
    pub fn store(&mut self, key: CacheKey, records: Arc<Vec<RawRecord>>) {
        self.cache.insert(key, records);
    }

    /// Retrieve a record set from the cache
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<RawRecord>>> {
        self.cache.get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains_key(key)
    }

}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}
