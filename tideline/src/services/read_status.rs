use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CandidatePost, ReadState, ReadSummary};
use crate::stores::FeedViewStore;

/// Per-viewer set of post ids marked read in the current process lifetime.
/// Injected into the engine rather than living as a module-level global, so
/// its lifecycle is explicit and tests can reset it.
#[derive(Clone, Default)]
pub struct SessionReadStore {
    inner: Arc<RwLock<HashMap<String, HashSet<String>>>>,
}

impl SessionReadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; marking an already-read post is a no-op.
    pub fn mark_read(&self, viewer_id: &str, post_ids: &[String]) {
        let mut map = self.inner.write().unwrap();
        let set = map.entry(viewer_id.to_string()).or_default();
        for id in post_ids {
            set.insert(id.clone());
        }
    }

    pub fn is_read(&self, viewer_id: &str, post_id: &str) -> bool {
        let map = self.inner.read().unwrap();
        map.get(viewer_id).is_some_and(|set| set.contains(post_id))
    }

    /// Drops the viewer's entire session set.
    pub fn clear(&self, viewer_id: &str) {
        self.inner.write().unwrap().remove(viewer_id);
    }

    pub fn read_count(&self, viewer_id: &str) -> usize {
        let map = self.inner.read().unwrap();
        map.get(viewer_id).map(|set| set.len()).unwrap_or(0)
    }
}

/// Combines the in-memory session record with the persisted `last_feed_view`
/// timestamp. Fetching a feed never updates `last_feed_view`; only the
/// explicit acknowledge operation does.
#[derive(Clone)]
pub struct ReadStatusTracker {
    session: SessionReadStore,
    feed_views: Arc<dyn FeedViewStore>,
}

impl ReadStatusTracker {
    pub fn new(session: SessionReadStore, feed_views: Arc<dyn FeedViewStore>) -> Self {
        Self {
            session,
            feed_views,
        }
    }

    pub fn mark_read(&self, viewer_id: &str, post_ids: &[String]) {
        self.session.mark_read(viewer_id, post_ids);
    }

    pub fn is_post_read(&self, viewer_id: &str, post_id: &str) -> bool {
        self.session.is_read(viewer_id, post_id)
    }

    pub fn clear(&self, viewer_id: &str) {
        self.session.clear(viewer_id);
    }

    pub async fn last_feed_view(&self, viewer_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.feed_views.last_feed_view(viewer_id).await
    }

    /// Persist "the viewer has seen their feed as of now". Returns the
    /// recorded timestamp.
    pub async fn acknowledge_feed_view(&self, viewer_id: &str) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        self.feed_views.set_last_feed_view(viewer_id, now).await?;
        Ok(now)
    }

    pub async fn summary(&self, viewer_id: &str) -> Result<ReadSummary> {
        let last_feed_view = self.feed_views.last_feed_view(viewer_id).await?;
        Ok(ReadSummary {
            viewer_id: viewer_id.to_string(),
            session_read_count: self.session.read_count(viewer_id),
            last_feed_view,
        })
    }

    /// Classify a post for scoring. A post is unread iff it was created after
    /// the viewer's last acknowledged feed view (a never-acknowledged viewer
    /// sees everything as unread) and has not been read this session.
    /// Session reads win over freshness.
    pub fn classify(
        &self,
        viewer_id: &str,
        post: &CandidatePost,
        last_feed_view: Option<DateTime<Utc>>,
    ) -> ReadState {
        if self.session.is_read(viewer_id, &post.id) {
            return ReadState::ReadInSession;
        }
        let fresh = match (post.created_at, last_feed_view) {
            (Some(created), Some(seen)) => created > seen,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if fresh {
            ReadState::Unread
        } else {
            ReadState::Seen
        }
    }
}
