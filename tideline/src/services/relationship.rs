use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::{FeedConfig, RelationshipConfig};
use crate::error::Result;
use crate::stores::{InteractionStore, SocialGraphStore};

/// Everything needed to answer per-author relationship multipliers for one
/// viewer, loaded in a single batch pass. Snapshots are immutable and cached
/// per viewer by the preference cache.
#[derive(Debug, Clone)]
pub struct RelationshipSnapshot {
    viewer_id: String,
    /// author id -> follow edge creation time
    outgoing: HashMap<String, DateTime<Utc>>,
    /// viewers following this viewer back
    incoming: HashSet<String>,
    second_tier: HashSet<String>,
    /// author id -> interaction count inside the rolling window
    interactions: HashMap<String, u32>,
}

impl RelationshipSnapshot {
    /// Snapshot with no relationships at all; every multiplier is 1.0 unless
    /// a preference boost applies (and there are no interactions either).
    pub fn neutral(viewer_id: &str) -> Self {
        Self {
            viewer_id: viewer_id.to_string(),
            outgoing: HashMap::new(),
            incoming: HashSet::new(),
            second_tier: HashSet::new(),
            interactions: HashMap::new(),
        }
    }

    pub fn interaction_count(&self, author_id: &str) -> u32 {
        self.interactions.get(author_id).copied().unwrap_or(0)
    }

    /// Relationship multiplier for one author. Priority order, highest wins:
    /// mutual follow, direct follow (graduated by age), second tier, none.
    /// The frequent-interactor boost only applies when the follow multiplier
    /// is at or below the exclusion threshold, and never stacks.
    pub fn multiplier(&self, author_id: &str, now: DateTime<Utc>, config: &RelationshipConfig) -> f64 {
        if author_id == self.viewer_id {
            return 1.0;
        }

        let follow_mult = if let Some(followed_at) = self.outgoing.get(author_id) {
            if self.incoming.contains(author_id) {
                config.mutual_bonus
            } else {
                self.direct_follow_multiplier(author_id, *followed_at, now, config)
            }
        } else if self.second_tier.contains(author_id) {
            config.second_tier_multiplier
        } else {
            1.0
        };

        let interaction_count = self.interaction_count(author_id);
        if interaction_count >= config.interaction_threshold
            && follow_mult <= config.preference_exclusion_threshold
        {
            follow_mult.max(config.preference_multiplier)
        } else {
            follow_mult
        }
    }

    fn direct_follow_multiplier(
        &self,
        author_id: &str,
        followed_at: DateTime<Utc>,
        now: DateTime<Utc>,
        config: &RelationshipConfig,
    ) -> f64 {
        let age_days = (now - followed_at).num_days();

        let mut multiplier = if age_days <= config.new_follow_threshold_days {
            config.new_follow_bonus
        } else if age_days <= config.established_threshold_days {
            config.established_bonus
        } else {
            config.base_multiplier
        };

        if age_days <= config.recent_follow_days {
            multiplier *= 1.0 + config.recent_follow_boost;
        }
        if self.interaction_count(author_id) >= config.high_engagement_threshold {
            multiplier *= 1.0 + config.high_engagement_bonus;
        }
        multiplier
    }
}

/// Batch-loads follow edges, second-tier membership, and interaction history
/// for a viewer, producing an in-memory snapshot the scoring path can query
/// without further I/O.
#[derive(Clone)]
pub struct RelationshipResolver {
    graph: Arc<dyn SocialGraphStore>,
    interactions: Arc<dyn InteractionStore>,
    config: Arc<FeedConfig>,
}

impl RelationshipResolver {
    pub fn new(
        graph: Arc<dyn SocialGraphStore>,
        interactions: Arc<dyn InteractionStore>,
        config: Arc<FeedConfig>,
    ) -> Self {
        Self {
            graph,
            interactions,
            config,
        }
    }

    pub async fn snapshot(&self, viewer_id: &str) -> Result<RelationshipSnapshot> {
        let window = Duration::days(self.config.relationship.interaction_window_days);

        let (outgoing, incoming, second_tier, interactions) = tokio::join!(
            self.graph.outgoing_follows(viewer_id),
            self.graph.incoming_follows(viewer_id),
            self.graph.second_tier_authors(viewer_id),
            self.interactions.interaction_counts(viewer_id, window),
        );

        let outgoing: HashMap<String, DateTime<Utc>> = outgoing?
            .into_iter()
            .filter(|e| e.is_active())
            .map(|e| (e.followed_id, e.created_at))
            .collect();
        let incoming: HashSet<String> = incoming?
            .into_iter()
            .filter(|e| e.is_active())
            .map(|e| e.follower_id)
            .collect();

        Ok(RelationshipSnapshot {
            viewer_id: viewer_id.to_string(),
            outgoing,
            incoming,
            second_tier: second_tier?,
            interactions: interactions?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{InMemoryInteractionStore, InMemorySocialGraphStore};

    fn config() -> Arc<FeedConfig> {
        Arc::new(FeedConfig::default())
    }

    async fn snapshot_for(
        graph: InMemorySocialGraphStore,
        interactions: InMemoryInteractionStore,
    ) -> RelationshipSnapshot {
        let resolver = RelationshipResolver::new(Arc::new(graph), Arc::new(interactions), config());
        resolver.snapshot("viewer").await.unwrap()
    }

    #[tokio::test]
    async fn test_mutual_follow_wins() {
        let graph = InMemorySocialGraphStore::new();
        let now = Utc::now();
        graph.follow("viewer", "friend", now - Duration::days(100));
        graph.follow("friend", "viewer", now - Duration::days(100));

        let snapshot = snapshot_for(graph, InMemoryInteractionStore::new()).await;
        let cfg = config();
        assert_eq!(
            snapshot.multiplier("friend", now, &cfg.relationship),
            cfg.relationship.mutual_bonus
        );
    }

    #[tokio::test]
    async fn test_direct_follow_graduated_by_age() {
        let graph = InMemorySocialGraphStore::new();
        let now = Utc::now();
        graph.follow("viewer", "new", now - Duration::days(5));
        graph.follow("viewer", "established", now - Duration::days(20));
        graph.follow("viewer", "old", now - Duration::days(200));

        let snapshot = snapshot_for(graph, InMemoryInteractionStore::new()).await;
        let cfg = config();
        let r = &cfg.relationship;

        // 5 days is inside the new-follow window but past the recent boost
        assert_eq!(snapshot.multiplier("new", now, r), r.new_follow_bonus);
        assert_eq!(snapshot.multiplier("established", now, r), r.established_bonus);
        assert_eq!(snapshot.multiplier("old", now, r), r.base_multiplier);
    }

    #[tokio::test]
    async fn test_recent_follow_boost_applies() {
        let graph = InMemorySocialGraphStore::new();
        let now = Utc::now();
        graph.follow("viewer", "brand_new", now - Duration::days(1));

        let snapshot = snapshot_for(graph, InMemoryInteractionStore::new()).await;
        let cfg = config();
        let r = &cfg.relationship;
        let expected = r.new_follow_bonus * (1.0 + r.recent_follow_boost);
        assert_eq!(snapshot.multiplier("brand_new", now, r), expected);
    }

    #[tokio::test]
    async fn test_high_engagement_bonus_on_follow() {
        let graph = InMemorySocialGraphStore::new();
        let interactions = InMemoryInteractionStore::new();
        let now = Utc::now();
        graph.follow("viewer", "bestie", now - Duration::days(20));
        for _ in 0..12 {
            interactions.record("viewer", "bestie", now - Duration::days(2));
        }

        let snapshot = snapshot_for(graph, interactions).await;
        let cfg = config();
        let r = &cfg.relationship;
        let expected = r.established_bonus * (1.0 + r.high_engagement_bonus);
        assert_eq!(snapshot.multiplier("bestie", now, r), expected);
    }

    #[tokio::test]
    async fn test_second_tier_multiplier() {
        let graph = InMemorySocialGraphStore::new();
        let now = Utc::now();
        graph.follow("viewer", "friend", now - Duration::days(50));
        graph.follow("friend", "stranger", now - Duration::days(50));

        let snapshot = snapshot_for(graph, InMemoryInteractionStore::new()).await;
        let cfg = config();
        assert_eq!(
            snapshot.multiplier("stranger", now, &cfg.relationship),
            cfg.relationship.second_tier_multiplier
        );
    }

    #[tokio::test]
    async fn test_preference_boost_without_follow() {
        let interactions = InMemoryInteractionStore::new();
        let now = Utc::now();
        for _ in 0..6 {
            interactions.record("viewer", "chatty", now - Duration::days(1));
        }

        let snapshot = snapshot_for(InMemorySocialGraphStore::new(), interactions).await;
        let cfg = config();
        assert_eq!(
            snapshot.multiplier("chatty", now, &cfg.relationship),
            cfg.relationship.preference_multiplier
        );
    }

    #[tokio::test]
    async fn test_preference_boost_excluded_by_follow_bonus() {
        let graph = InMemorySocialGraphStore::new();
        let interactions = InMemoryInteractionStore::new();
        let now = Utc::now();
        graph.follow("viewer", "friend", now - Duration::days(200));
        for _ in 0..6 {
            interactions.record("viewer", "friend", now - Duration::days(1));
        }

        let snapshot = snapshot_for(graph, interactions).await;
        let cfg = config();
        // base_multiplier (1.5) exceeds the exclusion threshold (1.1), so the
        // preference boost must not replace it.
        assert_eq!(
            snapshot.multiplier("friend", now, &cfg.relationship),
            cfg.relationship.base_multiplier
        );
    }

    #[tokio::test]
    async fn test_self_is_neutral() {
        let graph = InMemorySocialGraphStore::new();
        let now = Utc::now();
        graph.follow("viewer", "viewer", now);

        let snapshot = snapshot_for(graph, InMemoryInteractionStore::new()).await;
        let cfg = config();
        assert_eq!(snapshot.multiplier("viewer", now, &cfg.relationship), 1.0);
    }

    #[tokio::test]
    async fn test_no_relationship_is_neutral() {
        let snapshot = snapshot_for(
            InMemorySocialGraphStore::new(),
            InMemoryInteractionStore::new(),
        )
        .await;
        let cfg = config();
        assert_eq!(
            snapshot.multiplier("nobody", Utc::now(), &cfg.relationship),
            1.0
        );
    }
}
