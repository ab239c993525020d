use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::cache::{EngagementCache, PreferenceCache};
use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::models::{
    CandidatePost, EngagementCounts, FeedPage, FeedRequest, ReadSummary, ScoreBreakdown,
    ScoredPost,
};
use crate::stores::{
    EngagementStore, FeedViewStore, InteractionStore, PostStore, SocialGraphStore,
};

use super::diversity::DiversityEnforcer;
use super::read_status::{ReadStatusTracker, SessionReadStore};
use super::relationship::{RelationshipResolver, RelationshipSnapshot};
use super::scoring::{sort_by_score_desc, ScoreCtx, ScoringEngine};

/// Orchestrates one ranking pass: candidate over-fetch, concurrent batch
/// loads, scoring, diversity enforcement, pagination, and blending. This is
/// the only component that talks to the store layer.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostStore>,
    engagement: Arc<dyn EngagementStore>,
    resolver: RelationshipResolver,
    read_status: ReadStatusTracker,
    scorer: ScoringEngine,
    diversity: DiversityEnforcer,
    engagement_cache: EngagementCache,
    preference_cache: PreferenceCache,
    config: Arc<FeedConfig>,
}

impl FeedService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<FeedConfig>,
        posts: Arc<dyn PostStore>,
        engagement: Arc<dyn EngagementStore>,
        graph: Arc<dyn SocialGraphStore>,
        interactions: Arc<dyn InteractionStore>,
        feed_views: Arc<dyn FeedViewStore>,
        session_reads: SessionReadStore,
    ) -> Self {
        Self {
            posts,
            engagement,
            resolver: RelationshipResolver::new(graph, interactions, Arc::clone(&config)),
            read_status: ReadStatusTracker::new(session_reads, feed_views),
            scorer: ScoringEngine::new(Arc::clone(&config)),
            diversity: DiversityEnforcer::new(Arc::clone(&config)),
            engagement_cache: EngagementCache::new(&config.cache),
            preference_cache: PreferenceCache::new(&config.cache),
            config,
        }
    }

    /// One personalized ranking pass. Each optional data dimension degrades
    /// to neutral multipliers on failure; only a failed candidate fetch
    /// aborts the request.
    pub async fn personalized_feed(&self, req: &FeedRequest) -> Result<FeedPage> {
        let start = Instant::now();
        let now = Utc::now();

        let total_count = match self.posts.count_public_posts().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Public post count unavailable: {}", e);
                0
            }
        };

        if req.limit == 0 {
            return Ok(FeedPage {
                posts: Vec::new(),
                total_count,
                elapsed_ms: start.elapsed().as_millis() as u64,
            });
        }

        // Over-fetch to survive diversity filtering and the page offset.
        let fetch = req.limit * self.config.assembler.candidate_multiplier as usize + req.offset;
        let candidates = self
            .posts
            .recent_public_posts(fetch, 0, &HashSet::new())
            .await
            .map_err(|e| FeedError::DataUnavailable {
                source_name: "posts".to_string(),
                message: e.to_string(),
            })?;

        let page = if req.algorithm_enabled {
            let ranked = self.rank(req, &candidates, now).await;
            if req.refresh_mode {
                blend_refresh(ranked, req.limit, req.offset)
            } else {
                blend_standard(
                    ranked,
                    &candidates,
                    req.limit,
                    req.offset,
                    self.config.assembler.algorithm_share,
                    &req.viewer_id,
                )
            }
        } else {
            // Pure reverse-chronological order, no scoring.
            candidates
                .iter()
                .skip(req.offset)
                .take(req.limit)
                .map(|post| chronological_entry(post, &req.viewer_id))
                .collect()
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms > self.config.assembler.request_budget_ms {
            warn!(
                viewer_id = req.viewer_id.as_str(),
                elapsed_ms,
                budget_ms = self.config.assembler.request_budget_ms,
                "Feed request exceeded latency budget"
            );
        } else {
            debug!(
                viewer_id = req.viewer_id.as_str(),
                elapsed_ms,
                returned = page.len(),
                "Feed request complete"
            );
        }

        Ok(FeedPage {
            posts: page,
            total_count,
            elapsed_ms,
        })
    }

    /// Scores and diversity-filters the candidate set. The three independent
    /// batch reads are dispatched concurrently and joined before scoring.
    async fn rank(
        &self,
        req: &FeedRequest,
        candidates: &[CandidatePost],
        now: DateTime<Utc>,
    ) -> Vec<ScoredPost> {
        let ids: Vec<String> = candidates.iter().map(|p| p.id.clone()).collect();

        let (engagement, snapshot, mentions, last_view) = tokio::join!(
            self.load_engagement(&ids),
            self.load_snapshot(&req.viewer_id),
            self.posts.mentioned_post_ids(&req.viewer_id, &ids),
            self.read_status.last_feed_view(&req.viewer_id),
        );

        let mentions = mentions.unwrap_or_else(|e| {
            warn!("Mention lookup failed, scoring without mention bonus: {}", e);
            HashSet::new()
        });
        let last_view = last_view.unwrap_or_else(|e| {
            warn!("last_feed_view unavailable, treating feed as never viewed: {}", e);
            None
        });

        let mut scored: Vec<ScoredPost> = candidates
            .iter()
            .map(|post| {
                let state = self.read_status.classify(&req.viewer_id, post, last_view);
                let ctx = ScoreCtx {
                    viewer_id: &req.viewer_id,
                    counts: engagement.get(&post.id).copied().unwrap_or_default(),
                    relationship: snapshot.multiplier(
                        &post.author_id,
                        now,
                        &self.config.relationship,
                    ),
                    // Read state only moves the score when asked to; the
                    // unread flag itself is always reported.
                    read_state: req.consider_read_status.then_some(state),
                    mentioned: mentions.contains(&post.id),
                    now,
                };
                let mut entry = self.scorer.score(post, &ctx);
                entry.unread = state == crate::models::ReadState::Unread;
                entry
            })
            .collect();

        sort_by_score_desc(&mut scored);
        self.diversity.apply(scored)
    }

    /// Engagement counts for the candidate ids, via the TTL cache. Missing
    /// entries after a failed batch fetch score as zero engagement.
    async fn load_engagement(&self, post_ids: &[String]) -> HashMap<String, EngagementCounts> {
        let (mut hits, missing) = self.engagement_cache.get_many(post_ids);
        if missing.is_empty() {
            return hits;
        }
        match self.engagement.batch_engagement(&missing).await {
            Ok(fetched) => {
                self.engagement_cache.insert_many(&fetched);
                hits.extend(fetched);
            }
            Err(e) => {
                warn!(
                    missing = missing.len(),
                    "Engagement batch fetch failed, scoring misses as zero: {}", e
                );
            }
        }
        hits
    }

    /// Relationship snapshot for the viewer, via the preference cache.
    /// Degrades to a neutral snapshot (which is not cached) on failure.
    async fn load_snapshot(&self, viewer_id: &str) -> Arc<RelationshipSnapshot> {
        if let Some(snapshot) = self.preference_cache.get(viewer_id) {
            return snapshot;
        }
        match self.resolver.snapshot(viewer_id).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.preference_cache.insert(viewer_id, Arc::clone(&snapshot));
                snapshot
            }
            Err(e) => {
                warn!(viewer_id, "Preference load failed, scoring neutral: {}", e);
                Arc::new(RelationshipSnapshot::neutral(viewer_id))
            }
        }
    }

    /// Engagement-only trending variant: double-weighted counts, a simple
    /// linear recency bonus, and no diversity or relationship passes.
    pub async fn trending_posts(
        &self,
        viewer_id: Option<&str>,
        limit: usize,
        window_hours: f64,
    ) -> Result<Vec<ScoredPost>> {
        let now = Utc::now();
        let window_hours = if window_hours > 0.0 {
            window_hours
        } else {
            self.config.assembler.trending_window_hours
        };

        let fetch = limit * self.config.assembler.candidate_multiplier as usize;
        let candidates = self
            .posts
            .recent_public_posts(fetch, 0, &HashSet::new())
            .await
            .map_err(|e| FeedError::DataUnavailable {
                source_name: "posts".to_string(),
                message: e.to_string(),
            })?;

        let in_window: Vec<&CandidatePost> = candidates
            .iter()
            .filter(|p| match p.created_at {
                Some(created) => (now - created) <= hours_duration(window_hours),
                None => false,
            })
            .collect();

        let ids: Vec<String> = in_window.iter().map(|p| p.id.clone()).collect();
        let engagement = self.load_engagement(&ids).await;

        let s = &self.config.scoring;
        let mut scored: Vec<ScoredPost> = in_window
            .into_iter()
            .map(|post| {
                let counts = engagement.get(&post.id).copied().unwrap_or_default();
                let points = counts.hearts as f64 * s.heart_weight
                    + counts.reactions as f64 * s.reaction_weight
                    + counts.shares as f64 * s.share_weight;
                // Double-weighted engagement, capped at twice the normal cap.
                let engagement_mult =
                    (1.0 + 2.0 * points).min(2.0 * s.max_engagement_multiplier);
                let hours_old = post
                    .created_at
                    .map(|c| ((now - c).num_seconds() as f64 / 3600.0).max(0.0))
                    .unwrap_or(0.0);
                let recency = 1.0 + (1.0 - hours_old / window_hours).max(0.0);

                let breakdown = ScoreBreakdown {
                    engagement: engagement_mult,
                    time: recency,
                    ..ScoreBreakdown::neutral()
                };
                ScoredPost {
                    score: breakdown.product(),
                    breakdown,
                    is_own_post: viewer_id.is_some_and(|v| v == post.author_id),
                    unread: false,
                    spacing_penalty_applied: false,
                    post: post.clone(),
                }
            })
            .collect();

        sort_by_score_desc(&mut scored);
        scored.truncate(limit);
        info!(returned = scored.len(), window_hours, "Trending pass complete");
        Ok(scored)
    }

    // Read-status operations, exposed on the service so callers have a single
    // engine handle.

    pub fn mark_posts_read(&self, viewer_id: &str, post_ids: &[String]) {
        self.read_status.mark_read(viewer_id, post_ids);
    }

    pub fn clear_read_status(&self, viewer_id: &str) {
        self.read_status.clear(viewer_id);
    }

    pub fn is_post_read(&self, viewer_id: &str, post_id: &str) -> bool {
        self.read_status.is_post_read(viewer_id, post_id)
    }

    pub async fn read_summary(&self, viewer_id: &str) -> Result<ReadSummary> {
        self.read_status.summary(viewer_id).await
    }

    pub async fn acknowledge_feed_view(&self, viewer_id: &str) -> Result<DateTime<Utc>> {
        self.read_status.acknowledge_feed_view(viewer_id).await
    }

    /// Drop a viewer's cached relationship snapshot after a follow-graph or
    /// interaction mutation.
    pub fn invalidate_preferences(&self, viewer_id: &str) {
        self.preference_cache.invalidate(viewer_id);
    }

    pub fn invalidate_engagement(&self, post_id: &str) {
        self.engagement_cache.invalidate(post_id);
    }
}

fn hours_duration(hours: f64) -> Duration {
    Duration::seconds((hours * 3600.0) as i64)
}

/// Neutral-scored entry for algorithm-disabled mode.
fn chronological_entry(post: &CandidatePost, viewer_id: &str) -> ScoredPost {
    ScoredPost {
        post: post.clone(),
        breakdown: ScoreBreakdown::neutral(),
        score: 0.0,
        is_own_post: post.author_id == viewer_id,
        unread: false,
        spacing_penalty_applied: false,
    }
}

/// Standard blend: most of the page from the ranked list, the remainder from
/// the most-recent candidates not already served, so fresh content survives
/// score plateaus and diversity drops. Offset paginates both streams: a page
/// at offset N starts where the previous pages' algorithm and fallback picks
/// left off.
fn blend_standard(
    ranked: Vec<ScoredPost>,
    candidates: &[CandidatePost],
    limit: usize,
    offset: usize,
    algorithm_share: f64,
    viewer_id: &str,
) -> Vec<ScoredPost> {
    let algorithm_take = ((limit as f64) * algorithm_share).floor() as usize;
    let algorithm_skip = offset * algorithm_take / limit;
    let fallback_skip = offset - algorithm_skip;

    let mut page: Vec<ScoredPost> = ranked
        .iter()
        .skip(algorithm_skip)
        .take(algorithm_take)
        .cloned()
        .collect();

    // Everything the algorithm stream has served through this page is off
    // limits to the fallback, including picks from earlier pages.
    let mut selected: HashSet<String> = ranked
        .iter()
        .take(algorithm_skip + algorithm_take)
        .map(|p| p.post.id.clone())
        .collect();

    // Recency fallback over the raw candidate list (newest first). Posts that
    // survived ranking keep their breakdowns; posts the diversity passes
    // dropped come back as neutral entries.
    let by_id: HashMap<&str, &ScoredPost> =
        ranked.iter().map(|p| (p.post.id.as_str(), p)).collect();
    let mut skipped = 0usize;
    for candidate in candidates {
        if page.len() >= limit {
            break;
        }
        if selected.contains(&candidate.id) {
            continue;
        }
        if skipped < fallback_skip {
            skipped += 1;
            continue;
        }
        selected.insert(candidate.id.clone());
        match by_id.get(candidate.id.as_str()) {
            Some(scored) => page.push((*scored).clone()),
            None => page.push(chronological_entry(candidate, viewer_id)),
        }
    }
    page
}

/// Refresh blend: strictly-unread posts first (ranked order preserved), then
/// the rest of the ranked pool, deduplicated, then paginated.
fn blend_refresh(ranked: Vec<ScoredPost>, limit: usize, offset: usize) -> Vec<ScoredPost> {
    let (unread, rest): (Vec<ScoredPost>, Vec<ScoredPost>) =
        ranked.into_iter().partition(|p| p.unread);

    unread
        .into_iter()
        .chain(rest)
        .skip(offset)
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn scored(id: &str, author: &str, score: f64, unread: bool) -> ScoredPost {
        ScoredPost {
            post: CandidatePost::new(id, author, ContentType::Daily, Utc::now()),
            breakdown: ScoreBreakdown::neutral(),
            score,
            is_own_post: false,
            unread,
            spacing_penalty_applied: false,
        }
    }

    #[test]
    fn test_blend_standard_eighty_twenty() {
        // Ranked order differs from recency order: candidates c0..c11 are
        // newest-first, ranked list is reversed.
        let candidates: Vec<CandidatePost> = (0..12)
            .map(|i| {
                CandidatePost::new(
                    format!("c{i}"),
                    "a",
                    ContentType::Daily,
                    Utc::now() - Duration::hours(i),
                )
            })
            .collect();
        let ranked: Vec<ScoredPost> = (0..12)
            .rev()
            .map(|i| scored(&format!("c{i}"), "a", 12.0 - i as f64, false))
            .collect();

        let page = blend_standard(ranked, &candidates, 10, 0, 0.8, "viewer");
        assert_eq!(page.len(), 10);

        // 8 from the ranked head: c11..c4
        let algo: Vec<&str> = page[..8].iter().map(|p| p.post.id.as_str()).collect();
        assert_eq!(algo, vec!["c11", "c10", "c9", "c8", "c7", "c6", "c5", "c4"]);
        // 2 recency-fallback picks: the newest not already selected
        let fallback: Vec<&str> = page[8..].iter().map(|p| p.post.id.as_str()).collect();
        assert_eq!(fallback, vec!["c0", "c1"]);
    }

    #[test]
    fn test_blend_standard_fallback_recovers_filtered_posts() {
        // The newest candidate was dropped by a diversity pass and is absent
        // from the ranked pool; the recency fallback still surfaces it.
        let candidates: Vec<CandidatePost> = (0..12)
            .map(|i| {
                CandidatePost::new(
                    format!("c{i}"),
                    "a",
                    ContentType::Daily,
                    Utc::now() - Duration::hours(i),
                )
            })
            .collect();
        let ranked: Vec<ScoredPost> = (1..12)
            .map(|i| scored(&format!("c{i}"), "a", 12.0 - i as f64, false))
            .collect();

        let page = blend_standard(ranked, &candidates, 10, 0, 0.8, "viewer");
        let dropped = page
            .iter()
            .find(|p| p.post.id == "c0")
            .expect("filtered-out newest post must come back via the fallback");
        assert_eq!(dropped.score, 0.0);
        assert_eq!(dropped.breakdown.engagement, 1.0);
    }

    #[test]
    fn test_blend_standard_offset_advances_both_streams() {
        let candidates: Vec<CandidatePost> = (0..30)
            .map(|i| {
                CandidatePost::new(
                    format!("c{i}"),
                    "a",
                    ContentType::Daily,
                    Utc::now() - Duration::hours(i),
                )
            })
            .collect();
        // Ranked order is the reverse of recency order.
        let ranked: Vec<ScoredPost> = (0..30)
            .rev()
            .map(|i| scored(&format!("c{i}"), "a", 30.0 - i as f64, false))
            .collect();

        let first = blend_standard(ranked.clone(), &candidates, 10, 0, 0.8, "viewer");
        let second = blend_standard(ranked, &candidates, 10, 10, 0.8, "viewer");

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 10);
        let first_ids: HashSet<&str> = first.iter().map(|p| p.post.id.as_str()).collect();
        for p in &second {
            assert!(
                !first_ids.contains(p.post.id.as_str()),
                "{} was already served on the first page",
                p.post.id
            );
        }
        // The second page's fallback continues the recency stream: c0, c1
        // went to the first page, so c2, c3 come next.
        let fallback: Vec<&str> = second[8..].iter().map(|p| p.post.id.as_str()).collect();
        assert_eq!(fallback, vec!["c2", "c3"]);
    }

    #[test]
    fn test_blend_standard_no_duplicates() {
        let candidates: Vec<CandidatePost> = (0..15)
            .map(|i| {
                CandidatePost::new(
                    format!("c{i}"),
                    "a",
                    ContentType::Daily,
                    Utc::now() - Duration::hours(i),
                )
            })
            .collect();
        let ranked: Vec<ScoredPost> = (0..15)
            .map(|i| scored(&format!("c{i}"), "a", 15.0 - i as f64, false))
            .collect();

        let page = blend_standard(ranked, &candidates, 10, 0, 0.8, "viewer");
        let mut ids: Vec<&str> = page.iter().map(|p| p.post.id.as_str()).collect();
        let len_before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), len_before);
    }

    #[test]
    fn test_blend_refresh_unread_first() {
        let ranked = vec![
            scored("seen_hi", "a", 10.0, false),
            scored("unread_mid", "b", 5.0, true),
            scored("seen_lo", "c", 2.0, false),
            scored("unread_lo", "d", 1.0, true),
        ];

        let page = blend_refresh(ranked, 3, 0);
        let ids: Vec<&str> = page.iter().map(|p| p.post.id.as_str()).collect();
        assert_eq!(ids, vec!["unread_mid", "unread_lo", "seen_hi"]);
    }

    #[test]
    fn test_blend_refresh_fills_from_scored_pool() {
        let ranked = vec![
            scored("unread", "a", 5.0, true),
            scored("seen1", "b", 4.0, false),
            scored("seen2", "c", 3.0, false),
        ];

        let page = blend_refresh(ranked, 3, 0);
        assert_eq!(page.len(), 3);
        assert!(page[0].unread);
    }
}
