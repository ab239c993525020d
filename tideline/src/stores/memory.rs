//! In-memory store backends. Used by the test suite and by embedders that
//! keep their social graph in process memory.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{CandidatePost, EngagementCounts, FollowEdge, InteractionRecord};

use super::{EngagementStore, FeedViewStore, InteractionStore, PostStore, SocialGraphStore};

#[derive(Default)]
pub struct InMemoryPostStore {
    posts: RwLock<Vec<CandidatePost>>,
    /// post id -> viewer ids mentioned in that post
    mentions: RwLock<HashMap<String, HashSet<String>>>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, post: CandidatePost) {
        self.posts.write().unwrap().push(post);
    }

    pub fn insert_mention(&self, post_id: &str, viewer_id: &str) {
        self.mentions
            .write()
            .unwrap()
            .entry(post_id.to_string())
            .or_default()
            .insert(viewer_id.to_string());
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn recent_public_posts(
        &self,
        limit: usize,
        offset: usize,
        exclude_ids: &HashSet<String>,
    ) -> Result<Vec<CandidatePost>> {
        let posts = self.posts.read().unwrap();
        let mut publics: Vec<CandidatePost> = posts
            .iter()
            .filter(|p| p.is_public && !exclude_ids.contains(&p.id))
            .cloned()
            .collect();
        // Newest first; undated posts sort last.
        publics.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(publics.into_iter().skip(offset).take(limit).collect())
    }

    async fn count_public_posts(&self) -> Result<u64> {
        let posts = self.posts.read().unwrap();
        Ok(posts.iter().filter(|p| p.is_public).count() as u64)
    }

    async fn mentioned_post_ids(
        &self,
        viewer_id: &str,
        post_ids: &[String],
    ) -> Result<HashSet<String>> {
        let mentions = self.mentions.read().unwrap();
        Ok(post_ids
            .iter()
            .filter(|id| {
                mentions
                    .get(*id)
                    .is_some_and(|viewers| viewers.contains(viewer_id))
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryEngagementStore {
    counts: RwLock<HashMap<String, EngagementCounts>>,
}

impl InMemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, post_id: &str, counts: EngagementCounts) {
        self.counts
            .write()
            .unwrap()
            .insert(post_id.to_string(), counts);
    }
}

#[async_trait]
impl EngagementStore for InMemoryEngagementStore {
    async fn batch_engagement(
        &self,
        post_ids: &[String],
    ) -> Result<HashMap<String, EngagementCounts>> {
        let counts = self.counts.read().unwrap();
        Ok(post_ids
            .iter()
            .filter_map(|id| counts.get(id).map(|c| (id.clone(), *c)))
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySocialGraphStore {
    edges: RwLock<Vec<FollowEdge>>,
}

impl InMemorySocialGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, edge: FollowEdge) {
        self.edges.write().unwrap().push(edge);
    }

    pub fn follow(&self, follower: &str, followed: &str, created_at: DateTime<Utc>) {
        self.insert(FollowEdge::active(follower, followed, created_at));
    }
}

#[async_trait]
impl SocialGraphStore for InMemorySocialGraphStore {
    async fn outgoing_follows(&self, viewer_id: &str) -> Result<Vec<FollowEdge>> {
        let edges = self.edges.read().unwrap();
        Ok(edges
            .iter()
            .filter(|e| e.is_active() && e.follower_id == viewer_id)
            .cloned()
            .collect())
    }

    async fn incoming_follows(&self, viewer_id: &str) -> Result<Vec<FollowEdge>> {
        let edges = self.edges.read().unwrap();
        Ok(edges
            .iter()
            .filter(|e| e.is_active() && e.followed_id == viewer_id)
            .cloned()
            .collect())
    }

    async fn second_tier_authors(&self, viewer_id: &str) -> Result<HashSet<String>> {
        let edges = self.edges.read().unwrap();
        let direct: HashSet<&str> = edges
            .iter()
            .filter(|e| e.is_active() && e.follower_id == viewer_id)
            .map(|e| e.followed_id.as_str())
            .collect();

        let mut second_tier = HashSet::new();
        for edge in edges.iter() {
            if edge.is_active() && direct.contains(edge.follower_id.as_str()) {
                let author = edge.followed_id.as_str();
                if author != viewer_id && !direct.contains(author) {
                    second_tier.insert(author.to_string());
                }
            }
        }
        Ok(second_tier)
    }
}

#[derive(Default)]
pub struct InMemoryInteractionStore {
    records: RwLock<Vec<InteractionRecord>>,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: InteractionRecord) {
        self.records.write().unwrap().push(record);
    }

    pub fn record(&self, viewer_id: &str, author_id: &str, occurred_at: DateTime<Utc>) {
        self.insert(InteractionRecord {
            viewer_id: viewer_id.to_string(),
            author_id: author_id.to_string(),
            kind: "heart".to_string(),
            weight: 1.0,
            occurred_at,
        });
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn interaction_counts(
        &self,
        viewer_id: &str,
        window: Duration,
    ) -> Result<HashMap<String, u32>> {
        let cutoff = Utc::now() - window;
        let records = self.records.read().unwrap();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for record in records.iter() {
            if record.viewer_id == viewer_id && record.occurred_at > cutoff {
                *counts.entry(record.author_id.clone()).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[derive(Default)]
pub struct InMemoryFeedViewStore {
    views: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl InMemoryFeedViewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedViewStore for InMemoryFeedViewStore {
    async fn last_feed_view(&self, viewer_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.views.read().unwrap().get(viewer_id).copied())
    }

    async fn set_last_feed_view(&self, viewer_id: &str, at: DateTime<Utc>) -> Result<()> {
        self.views
            .write()
            .unwrap()
            .insert(viewer_id.to_string(), at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn post(id: &str, author: &str, hours_ago: i64) -> CandidatePost {
        CandidatePost::new(
            id,
            author,
            ContentType::Daily,
            Utc::now() - Duration::hours(hours_ago),
        )
    }

    #[tokio::test]
    async fn test_recent_public_posts_newest_first() {
        let store = InMemoryPostStore::new();
        store.insert(post("p1", "a", 5));
        store.insert(post("p2", "a", 1));
        store.insert(post("p3", "a", 3));

        let posts = store
            .recent_public_posts(10, 0, &HashSet::new())
            .await
            .unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3", "p1"]);
    }

    #[tokio::test]
    async fn test_recent_public_posts_excludes_and_paginates() {
        let store = InMemoryPostStore::new();
        for i in 0..5 {
            store.insert(post(&format!("p{i}"), "a", i));
        }
        let mut private = post("p5", "a", 0);
        private.is_public = false;
        store.insert(private);

        let exclude: HashSet<String> = ["p0".to_string()].into_iter().collect();
        let posts = store.recent_public_posts(2, 1, &exclude).await.unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p3"]);
        assert_eq!(store.count_public_posts().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_second_tier_excludes_self_and_direct() {
        let store = InMemorySocialGraphStore::new();
        let now = Utc::now();
        store.follow("viewer", "friend", now);
        store.follow("friend", "viewer", now);
        store.follow("friend", "friend_of_friend", now);
        store.follow("friend", "also_direct", now);
        store.follow("viewer", "also_direct", now);

        let second = store.second_tier_authors("viewer").await.unwrap();
        assert!(second.contains("friend_of_friend"));
        assert!(!second.contains("viewer"));
        assert!(!second.contains("also_direct"));
    }

    #[tokio::test]
    async fn test_interaction_counts_respect_window() {
        let store = InMemoryInteractionStore::new();
        let now = Utc::now();
        store.record("v", "a", now - Duration::days(1));
        store.record("v", "a", now - Duration::days(2));
        store.record("v", "a", now - Duration::days(45));
        store.record("other", "a", now);

        let counts = store
            .interaction_counts("v", Duration::days(30))
            .await
            .unwrap();
        assert_eq!(counts.get("a"), Some(&2));
    }

    #[tokio::test]
    async fn test_mentions_batch_lookup() {
        let store = InMemoryPostStore::new();
        store.insert(post("p1", "a", 1));
        store.insert(post("p2", "a", 2));
        store.insert_mention("p1", "viewer");

        let ids = vec!["p1".to_string(), "p2".to_string()];
        let mentioned = store.mentioned_post_ids("viewer", &ids).await.unwrap();
        assert!(mentioned.contains("p1"));
        assert!(!mentioned.contains("p2"));
    }
}
