use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{FeedConfig, OwnPostConfig};
use crate::models::{CandidatePost, EngagementCounts, ReadState, ScoreBreakdown, ScoredPost};

use super::time_bucket::TimeBucketTable;

/// Immutable inputs for scoring one post for one viewer. `now` is injected so
/// a score is reproducible from its inputs.
#[derive(Debug, Clone)]
pub struct ScoreCtx<'a> {
    pub viewer_id: &'a str,
    pub counts: EngagementCounts,
    pub relationship: f64,
    /// None when the request asked to ignore read status.
    pub read_state: Option<ReadState>,
    pub mentioned: bool,
    pub now: DateTime<Utc>,
}

/// The multiplicative scoring model. Every dimension defaults to a neutral
/// 1.0 when its data is absent; a post with zero data must never score zero.
#[derive(Clone)]
pub struct ScoringEngine {
    config: Arc<FeedConfig>,
    time_buckets: TimeBucketTable,
}

impl ScoringEngine {
    pub fn new(config: Arc<FeedConfig>) -> Self {
        let time_buckets = TimeBucketTable::new(&config.time_decay);
        Self {
            config,
            time_buckets,
        }
    }

    pub fn time_buckets(&self) -> &TimeBucketTable {
        &self.time_buckets
    }

    pub fn score(&self, post: &CandidatePost, ctx: &ScoreCtx<'_>) -> ScoredPost {
        let is_own_post = post.author_id == ctx.viewer_id;
        let scoring = &self.config.scoring;

        let engagement = self.engagement_multiplier(ctx.counts);

        let content = 1.0
            + match post.content_type {
                crate::models::ContentType::Photo => scoring.photo_bonus,
                crate::models::ContentType::Daily => scoring.daily_bonus,
                crate::models::ContentType::Spontaneous => 0.0,
            };

        // Missing created_at scores with a neutral time multiplier.
        let time = match post.created_at {
            Some(created) => {
                let hours_old = (ctx.now - created).num_seconds() as f64 / 3600.0;
                self.time_buckets.multiplier(hours_old)
            }
            None => 1.0,
        };

        let relationship = if is_own_post { 1.0 } else { ctx.relationship };

        // Own posts are exempt from the unread boost and its inverse.
        let unread = if is_own_post {
            1.0
        } else {
            match ctx.read_state {
                Some(ReadState::Unread) => scoring.unread_boost,
                Some(ReadState::ReadInSession) => 1.0 / scoring.unread_boost,
                Some(ReadState::Seen) | None => 1.0,
            }
        };

        let mention = if ctx.mentioned && !is_own_post {
            1.0 + scoring.mention_bonus
        } else {
            1.0
        };

        let own_post = if is_own_post {
            match post.created_at {
                Some(created) => {
                    let minutes_old = (ctx.now - created).num_seconds() as f64 / 60.0;
                    own_post_multiplier(minutes_old.max(0.0), &self.config.own_post)
                }
                None => 1.0,
            }
        } else {
            1.0
        };

        let breakdown = ScoreBreakdown {
            engagement,
            content,
            time,
            relationship,
            unread,
            mention,
            own_post,
        };

        ScoredPost {
            post: post.clone(),
            score: breakdown.product(),
            breakdown,
            is_own_post,
            unread: ctx.read_state == Some(ReadState::Unread),
            spacing_penalty_applied: false,
        }
    }

    fn engagement_multiplier(&self, counts: EngagementCounts) -> f64 {
        let s = &self.config.scoring;
        let points = counts.hearts as f64 * s.heart_weight
            + counts.reactions as f64 * s.reaction_weight
            + counts.shares as f64 * s.share_weight;
        (1.0 + points).min(s.max_engagement_multiplier)
    }
}

/// Visibility curve for the author viewing their own post: full max bonus
/// inside the visibility window, linear decay down to the base bonus across
/// the decay window, then a flat 2x base floor.
fn own_post_multiplier(minutes_old: f64, config: &OwnPostConfig) -> f64 {
    if minutes_old <= config.max_visibility_minutes {
        config.base_multiplier + config.max_bonus_multiplier
    } else if minutes_old <= config.decay_duration_minutes {
        let progress = (minutes_old - config.max_visibility_minutes)
            / (config.decay_duration_minutes - config.max_visibility_minutes);
        let bonus = config.max_bonus_multiplier
            - (config.max_bonus_multiplier - config.base_multiplier) * progress;
        config.base_multiplier + bonus
    } else {
        2.0 * config.base_multiplier
    }
}

/// Descending stable sort: equal scores keep their prior relative order.
pub fn sort_by_score_desc(posts: &mut [ScoredPost]) {
    posts.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
