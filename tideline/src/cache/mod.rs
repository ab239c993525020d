mod ttl;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub use ttl::TtlCache;

use crate::config::CacheConfig;
use crate::models::EngagementCounts;
use crate::services::RelationshipSnapshot;

/// TTL cache over per-post engagement counts (default 5 minutes).
#[derive(Clone)]
pub struct EngagementCache {
    inner: TtlCache<String, EngagementCounts>,
}

impl EngagementCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: TtlCache::new(
                config.engagement_capacity,
                Duration::from_secs(config.engagement_ttl_secs),
            ),
        }
    }

    /// Split `post_ids` into cached hits and ids that need a batch fetch.
    pub fn get_many(&self, post_ids: &[String]) -> (HashMap<String, EngagementCounts>, Vec<String>) {
        let mut hits = HashMap::new();
        let mut missing = Vec::new();
        for id in post_ids {
            match self.inner.get(id) {
                Some(counts) => {
                    hits.insert(id.clone(), counts);
                }
                None => missing.push(id.clone()),
            }
        }
        (hits, missing)
    }

    pub fn insert_many(&self, entries: &HashMap<String, EngagementCounts>) {
        for (id, counts) in entries {
            self.inner.insert(id.clone(), *counts);
        }
    }

    pub fn invalidate(&self, post_id: &str) {
        self.inner.invalidate(post_id);
    }
}

/// TTL cache over per-viewer relationship snapshots (default 30 minutes).
#[derive(Clone)]
pub struct PreferenceCache {
    inner: TtlCache<String, Arc<RelationshipSnapshot>>,
}

impl PreferenceCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: TtlCache::new(
                config.preference_capacity,
                Duration::from_secs(config.preference_ttl_secs),
            ),
        }
    }

    pub fn get(&self, viewer_id: &str) -> Option<Arc<RelationshipSnapshot>> {
        self.inner.get(viewer_id)
    }

    pub fn insert(&self, viewer_id: &str, snapshot: Arc<RelationshipSnapshot>) {
        self.inner.insert(viewer_id.to_string(), snapshot);
    }

    /// Drop a viewer's snapshot after a follow-graph mutation.
    pub fn invalidate(&self, viewer_id: &str) {
        self.inner.invalidate(viewer_id);
    }
}
