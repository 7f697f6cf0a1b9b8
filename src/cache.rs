use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::TransactionView;
use crate::ports::{Page, PageRequest};

/// List filter as it appears in a cache key. Absent and empty filters are both `All`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListFilter {
    All,
    Containing(String),
}

impl ListFilter {
    pub fn from_query(filter: Option<&str>) -> Self {
        match filter {
            Some(f) if !f.is_empty() => ListFilter::Containing(f.to_string()),
            _ => ListFilter::All,
        }
    }

    pub fn as_filter(&self) -> Option<&str> {
        match self {
            ListFilter::All => None,
            ListFilter::Containing(f) => Some(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    List {
        filter: ListFilter,
        page: i64,
        size: i64,
    },
    Detail(i64),
}

impl CacheKey {
    pub fn list(filter: ListFilter, request: PageRequest) -> Self {
        CacheKey::List {
            filter,
            page: request.page,
            size: request.size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    List(Page<TransactionView>),
    Detail(TransactionView),
}

#[derive(Default)]
struct Region {
    entries: HashMap<CacheKey, CachedValue>,
    generation: u64,
}

/// Single cache region shared by list and detail lookups.
///
/// Entries have no TTL; writers clear the whole region with `evict_all`.
/// Each eviction bumps the generation, and a `put` carrying an older
/// generation is dropped so a read that raced a write cannot outlive it.
#[derive(Clone, Default)]
pub struct TransactionCache {
    region: Arc<RwLock<Region>>,
}

impl TransactionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let value = self.region.read().await.entries.get(key).cloned();
        tracing::debug!(?key, hit = value.is_some(), "Transaction cache lookup");
        value
    }

    /// Generation to pass to `put` for a value about to be loaded.
    pub async fn generation(&self) -> u64 {
        self.region.read().await.generation
    }

    /// Stores `value` unless the region was evicted since `generation` was read.
    pub async fn put(&self, key: CacheKey, value: CachedValue, generation: u64) -> bool {
        let mut region = self.region.write().await;
        if region.generation != generation {
            tracing::debug!(?key, "Discarding value loaded before the last eviction");
            return false;
        }
        region.entries.insert(key, value);
        true
    }

    pub async fn evict_all(&self) {
        let mut region = self.region.write().await;
        let evicted = region.entries.len();
        region.entries.clear();
        region.generation += 1;
        tracing::debug!(evicted, "Transaction cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.region.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.region.read().await.entries.is_empty()
    }
}
