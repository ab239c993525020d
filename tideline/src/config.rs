use serde::Deserialize;
use std::env;

use crate::error::{FeedError, Result};

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Top-level engine configuration. Loaded once at startup, passed around as
/// `Arc<FeedConfig>`, and never mutated; a config reload means constructing a
/// new engine over the same stores.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub scoring: ScoringConfig,
    pub time_decay: TimeDecayConfig,
    pub relationship: RelationshipConfig,
    pub own_post: OwnPostConfig,
    pub diversity: DiversityConfig,
    pub assembler: AssemblerConfig,
    pub cache: CacheConfig,
}

/// Weights and bonuses for the multiplicative scoring model.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    pub heart_weight: f64,
    pub reaction_weight: f64,
    pub share_weight: f64,
    /// Cap on the engagement multiplier so viral posts cannot drown the feed.
    pub max_engagement_multiplier: f64,
    pub photo_bonus: f64,
    pub daily_bonus: f64,
    pub unread_boost: f64,
    pub mention_bonus: f64,
}

/// Recency bonuses and decay curve parameters for the time bucket table.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeDecayConfig {
    pub recent_boost_1hr: f64,
    pub recent_boost_6hr: f64,
    pub recent_boost_24hr: f64,
    /// Hours after which the exponential decay bottoms out at the 0.1 floor.
    pub decay_hours: f64,
}

/// Follow-graph and interaction-preference bonuses.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipConfig {
    pub mutual_bonus: f64,
    pub new_follow_bonus: f64,
    pub new_follow_threshold_days: i64,
    pub established_bonus: f64,
    pub established_threshold_days: i64,
    pub base_multiplier: f64,
    pub recent_follow_boost: f64,
    pub recent_follow_days: i64,
    pub high_engagement_bonus: f64,
    pub high_engagement_threshold: u32,
    pub second_tier_multiplier: f64,
    pub preference_multiplier: f64,
    pub interaction_threshold: u32,
    /// Preference boost only applies when the follow multiplier is at or
    /// below this value (kept from the source behavior as a tunable).
    pub preference_exclusion_threshold: f64,
    pub interaction_window_days: i64,
}

/// Visibility curve for the viewer's own fresh posts.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnPostConfig {
    pub base_multiplier: f64,
    pub max_bonus_multiplier: f64,
    /// Minutes during which the full max bonus applies.
    pub max_visibility_minutes: f64,
    /// Minutes after which the bonus has decayed down to the base value.
    pub decay_duration_minutes: f64,
}

/// Author-cap, content-type balancing, and spacing constraints.
#[derive(Debug, Clone, Deserialize)]
pub struct DiversityConfig {
    pub max_posts_per_author: usize,
    /// Per-content-type share of the surviving list, in (0, 1].
    pub photo_share: f64,
    pub daily_share: f64,
    pub spontaneous_share: f64,
    /// Lists shorter than this skip content-type balancing.
    pub balancing_min_len: usize,
    pub max_consecutive_posts_per_user: usize,
    pub spacing_window_size: usize,
    pub spacing_violation_penalty: f64,
    /// Lighter penalty for window-density violations that are not strict runs.
    pub window_density_penalty: f64,
}

/// Candidate over-fetch and blending policy for the feed assembler.
#[derive(Debug, Clone, Deserialize)]
pub struct AssemblerConfig {
    /// Candidates fetched per ranking pass, as a multiple of the page limit.
    pub candidate_multiplier: u32,
    /// Fraction of the page filled from algorithm-scored posts in standard
    /// mode; the remainder comes from the recency fallback.
    pub algorithm_share: f64,
    /// Soft latency budget per feed request, in milliseconds.
    pub request_budget_ms: u64,
    pub trending_window_hours: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub engagement_ttl_secs: u64,
    pub engagement_capacity: usize,
    pub preference_ttl_secs: u64,
    pub preference_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig {
                heart_weight: parse_env_or("FEED_HEART_WEIGHT", 1.0),
                reaction_weight: parse_env_or("FEED_REACTION_WEIGHT", 0.5),
                share_weight: parse_env_or("FEED_SHARE_WEIGHT", 2.0),
                max_engagement_multiplier: parse_env_or("FEED_MAX_ENGAGEMENT_MULT", 10.0),
                photo_bonus: parse_env_or("FEED_PHOTO_BONUS", 0.5),
                daily_bonus: parse_env_or("FEED_DAILY_BONUS", 0.3),
                unread_boost: parse_env_or("FEED_UNREAD_BOOST", 2.0),
                mention_bonus: parse_env_or("FEED_MENTION_BONUS", 1.0),
            },
            time_decay: TimeDecayConfig {
                recent_boost_1hr: parse_env_or("FEED_RECENT_BOOST_1HR", 3.0),
                recent_boost_6hr: parse_env_or("FEED_RECENT_BOOST_6HR", 2.0),
                recent_boost_24hr: parse_env_or("FEED_RECENT_BOOST_24HR", 1.0),
                decay_hours: parse_env_or("FEED_DECAY_HOURS", 168.0),
            },
            relationship: RelationshipConfig {
                mutual_bonus: parse_env_or("FEED_MUTUAL_BONUS", 3.0),
                new_follow_bonus: parse_env_or("FEED_NEW_FOLLOW_BONUS", 2.5),
                new_follow_threshold_days: parse_env_or("FEED_NEW_FOLLOW_DAYS", 7),
                established_bonus: parse_env_or("FEED_ESTABLISHED_BONUS", 2.0),
                established_threshold_days: parse_env_or("FEED_ESTABLISHED_DAYS", 30),
                base_multiplier: parse_env_or("FEED_FOLLOW_BASE_MULT", 1.5),
                recent_follow_boost: parse_env_or("FEED_RECENT_FOLLOW_BOOST", 0.2),
                recent_follow_days: parse_env_or("FEED_RECENT_FOLLOW_DAYS", 3),
                high_engagement_bonus: parse_env_or("FEED_HIGH_ENGAGEMENT_BONUS", 0.3),
                high_engagement_threshold: parse_env_or("FEED_HIGH_ENGAGEMENT_THRESHOLD", 10),
                second_tier_multiplier: parse_env_or("FEED_SECOND_TIER_MULT", 1.2),
                preference_multiplier: parse_env_or("FEED_PREFERENCE_MULT", 1.4),
                interaction_threshold: parse_env_or("FEED_INTERACTION_THRESHOLD", 5),
                preference_exclusion_threshold: parse_env_or("FEED_PREFERENCE_EXCLUSION", 1.1),
                interaction_window_days: parse_env_or("FEED_INTERACTION_WINDOW_DAYS", 30),
            },
            own_post: OwnPostConfig {
                base_multiplier: parse_env_or("FEED_OWN_POST_BASE", 1.5),
                max_bonus_multiplier: parse_env_or("FEED_OWN_POST_MAX_BONUS", 3.0),
                max_visibility_minutes: parse_env_or("FEED_OWN_POST_MAX_VIS_MIN", 5.0),
                decay_duration_minutes: parse_env_or("FEED_OWN_POST_DECAY_MIN", 60.0),
            },
            diversity: DiversityConfig {
                max_posts_per_author: parse_env_or("FEED_MAX_POSTS_PER_AUTHOR", 3),
                photo_share: parse_env_or("FEED_PHOTO_SHARE", 0.5),
                daily_share: parse_env_or("FEED_DAILY_SHARE", 0.5),
                spontaneous_share: parse_env_or("FEED_SPONTANEOUS_SHARE", 0.5),
                balancing_min_len: parse_env_or("FEED_BALANCING_MIN_LEN", 10),
                max_consecutive_posts_per_user: parse_env_or("FEED_MAX_CONSECUTIVE", 2),
                spacing_window_size: parse_env_or("FEED_SPACING_WINDOW", 5),
                spacing_violation_penalty: parse_env_or("FEED_SPACING_PENALTY", 0.5),
                window_density_penalty: parse_env_or("FEED_DENSITY_PENALTY", 0.8),
            },
            assembler: AssemblerConfig {
                candidate_multiplier: parse_env_or("FEED_CANDIDATE_MULTIPLIER", 3),
                algorithm_share: parse_env_or("FEED_ALGORITHM_SHARE", 0.8),
                request_budget_ms: parse_env_or("FEED_REQUEST_BUDGET_MS", 300),
                trending_window_hours: parse_env_or("FEED_TRENDING_WINDOW_HOURS", 24.0),
            },
            cache: CacheConfig {
                engagement_ttl_secs: parse_env_or("FEED_ENGAGEMENT_TTL_SECS", 300),
                engagement_capacity: parse_env_or("FEED_ENGAGEMENT_CACHE_CAPACITY", 10_000),
                preference_ttl_secs: parse_env_or("FEED_PREFERENCE_TTL_SECS", 1800),
                preference_capacity: parse_env_or("FEED_PREFERENCE_CACHE_CAPACITY", 2_000),
            },
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on malformed tunables before the engine serves anything.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if s.heart_weight < 0.0 || s.reaction_weight < 0.0 || s.share_weight < 0.0 {
            return Err(FeedError::ConfigurationInvalid(
                "engagement weights must be non-negative".to_string(),
            ));
        }
        if s.max_engagement_multiplier < 1.0 {
            return Err(FeedError::ConfigurationInvalid(
                "max_engagement_multiplier must be >= 1.0".to_string(),
            ));
        }
        if s.unread_boost <= 0.0 {
            return Err(FeedError::ConfigurationInvalid(
                "unread_boost must be positive".to_string(),
            ));
        }
        if self.time_decay.decay_hours <= 24.0 {
            return Err(FeedError::ConfigurationInvalid(
                "decay_hours must be greater than 24".to_string(),
            ));
        }
        let d = &self.diversity;
        for (name, share) in [
            ("photo_share", d.photo_share),
            ("daily_share", d.daily_share),
            ("spontaneous_share", d.spontaneous_share),
        ] {
            if !(share > 0.0 && share <= 1.0) {
                return Err(FeedError::ConfigurationInvalid(format!(
                    "{name} must be in (0, 1], got {share}"
                )));
            }
        }
        if d.max_posts_per_author == 0 {
            return Err(FeedError::ConfigurationInvalid(
                "max_posts_per_author must be at least 1".to_string(),
            ));
        }
        if d.spacing_window_size == 0 || d.max_consecutive_posts_per_user == 0 {
            return Err(FeedError::ConfigurationInvalid(
                "spacing window and consecutive limit must be at least 1".to_string(),
            ));
        }
        let a = &self.assembler;
        if a.candidate_multiplier == 0 {
            return Err(FeedError::ConfigurationInvalid(
                "candidate_multiplier must be at least 1".to_string(),
            ));
        }
        if !(a.algorithm_share > 0.0 && a.algorithm_share <= 1.0) {
            return Err(FeedError::ConfigurationInvalid(format!(
                "algorithm_share must be in (0, 1], got {}",
                a.algorithm_share
            )));
        }
        if self.own_post.decay_duration_minutes <= self.own_post.max_visibility_minutes {
            return Err(FeedError::ConfigurationInvalid(
                "own_post decay_duration_minutes must exceed max_visibility_minutes".to_string(),
            ));
        }
        if self.cache.engagement_capacity == 0 || self.cache.preference_capacity == 0 {
            return Err(FeedError::ConfigurationInvalid(
                "cache capacities must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
