use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{CandidatePost, EngagementCounts, FollowEdge};

mod memory;

pub use memory::{
    InMemoryEngagementStore, InMemoryFeedViewStore, InMemoryInteractionStore, InMemoryPostStore,
    InMemorySocialGraphStore,
};

/// Candidate retrieval and mention lookups. The engine never issues per-post
/// sequential queries; everything here is shaped for batch access.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Most-recent public posts, newest first, skipping `exclude_ids`.
    async fn recent_public_posts(
        &self,
        limit: usize,
        offset: usize,
        exclude_ids: &HashSet<String>,
    ) -> Result<Vec<CandidatePost>>;

    /// Total public post count, used for pagination independent of ranking.
    async fn count_public_posts(&self) -> Result<u64>;

    /// Subset of `post_ids` that mention the viewer.
    async fn mentioned_post_ids(
        &self,
        viewer_id: &str,
        post_ids: &[String],
    ) -> Result<HashSet<String>>;
}

/// Batch heart/reaction/share counts.
#[async_trait]
pub trait EngagementStore: Send + Sync {
    async fn batch_engagement(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, EngagementCounts>>;
}

/// Follow-graph reads. All methods return active edges only.
#[async_trait]
pub trait SocialGraphStore: Send + Sync {
    /// Edges where the viewer is the follower.
    async fn outgoing_follows(&self, viewer_id: &str) -> Result<Vec<FollowEdge>>;

    /// Edges where the viewer is the followed party.
    async fn incoming_follows(&self, viewer_id: &str) -> Result<Vec<FollowEdge>>;

    /// Authors followed by someone the viewer follows, excluding the viewer
    /// and their direct follows (two-hop join over active edges).
    async fn second_tier_authors(&self, viewer_id: &str) -> Result<HashSet<String>>;
}

/// Interaction history aggregated over a rolling window.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn interaction_counts(
        &self,
        viewer_id: &str,
        window: Duration,
    ) -> Result<HashMap<String, u32>>;
}

/// Persisted per-viewer `last_feed_view` timestamp. Single row per viewer,
/// last-write-wins.
#[async_trait]
pub trait FeedViewStore: Send + Sync {
    async fn last_feed_view(&self, viewer_id: &str) -> Result<Option<DateTime<Utc>>>;

    async fn set_last_feed_view(&self, viewer_id: &str, at: DateTime<Utc>) -> Result<()>;
}
