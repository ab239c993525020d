use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::config::{DiversityConfig, FeedConfig};
use crate::models::{ContentType, ScoredPost};

use super::scoring::sort_by_score_desc;

/// Upper bound on penalize-and-resort rounds; each round only touches posts
/// that have not been flagged yet, so this is a safety net, not a tuning knob.
const MAX_SPACING_ROUNDS: usize = 8;

/// Post-processes a score-sorted list: per-author cap, content-type
/// balancing, and same-author spacing. Pure and deterministic; a misconfigured
/// pass is skipped with a warning rather than failing the feed.
#[derive(Clone)]
pub struct DiversityEnforcer {
    config: Arc<FeedConfig>,
}

impl DiversityEnforcer {
    pub fn new(config: Arc<FeedConfig>) -> Self {
        Self { config }
    }

    pub fn apply(&self, posts: Vec<ScoredPost>) -> Vec<ScoredPost> {
        let d = &self.config.diversity;
        let posts = enforce_author_cap(posts, d);
        let posts = balance_content_types(posts, d);
        enforce_spacing(posts, d)
    }
}

/// Greedy in score order: the first N highest-scoring posts per author survive.
fn enforce_author_cap(posts: Vec<ScoredPost>, config: &DiversityConfig) -> Vec<ScoredPost> {
    if config.max_posts_per_author == 0 {
        warn!("max_posts_per_author is 0, skipping author cap");
        return posts;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    posts
        .into_iter()
        .filter(|p| {
            let count = seen.entry(p.post.author_id.clone()).or_insert(0);
            *count += 1;
            *count <= config.max_posts_per_author
        })
        .collect()
}

/// Caps each content type to its configured share of the list. Skipped for
/// short lists where the sample is too small to balance meaningfully.
fn balance_content_types(posts: Vec<ScoredPost>, config: &DiversityConfig) -> Vec<ScoredPost> {
    if posts.len() < config.balancing_min_len {
        return posts;
    }
    let share_for = |content_type: ContentType| match content_type {
        ContentType::Photo => config.photo_share,
        ContentType::Daily => config.daily_share,
        ContentType::Spontaneous => config.spontaneous_share,
    };
    for content_type in [ContentType::Photo, ContentType::Daily, ContentType::Spontaneous] {
        let share = share_for(content_type);
        if !(share > 0.0 && share <= 1.0) {
            warn!(?content_type, share, "invalid content share, skipping balancing");
            return posts;
        }
    }

    let total = posts.len();
    let mut kept: HashMap<ContentType, usize> = HashMap::new();
    posts
        .into_iter()
        .filter(|p| {
            let cap = (total as f64 * share_for(p.post.content_type)).ceil() as usize;
            let count = kept.entry(p.post.content_type).or_insert(0);
            *count += 1;
            *count <= cap
        })
        .collect()
}

/// Penalizes same-author runs and window-density violations, then re-sorts.
/// Strict runs longer than the consecutive limit get the heavy penalty; an
/// author merely over-represented inside the sliding window gets the lighter
/// one. Already-flagged posts are never penalized twice, which bounds the
/// number of rounds.
fn enforce_spacing(mut posts: Vec<ScoredPost>, config: &DiversityConfig) -> Vec<ScoredPost> {
    if config.spacing_window_size == 0 || config.max_consecutive_posts_per_user == 0 {
        warn!("spacing window or consecutive limit is 0, skipping spacing pass");
        return posts;
    }
    if !(config.spacing_violation_penalty > 0.0 && config.spacing_violation_penalty <= 1.0)
        || !(config.window_density_penalty > 0.0 && config.window_density_penalty <= 1.0)
    {
        warn!("spacing penalties must be in (0, 1], skipping spacing pass");
        return posts;
    }

    for _ in 0..MAX_SPACING_ROUNDS {
        let violations = find_spacing_violations(&posts, config);
        if violations.is_empty() {
            break;
        }
        for (index, strict) in violations {
            let penalty = if strict {
                config.spacing_violation_penalty
            } else {
                config.window_density_penalty
            };
            posts[index].score *= penalty;
            posts[index].spacing_penalty_applied = true;
        }
        sort_by_score_desc(&mut posts);
    }
    posts
}

/// Returns (index, is_strict_run) for each unflagged post that violates the
/// spacing rules in the current order. Lower-priority (later) posts are the
/// offenders; the leading posts of a run keep their position.
fn find_spacing_violations(posts: &[ScoredPost], config: &DiversityConfig) -> Vec<(usize, bool)> {
    let limit = config.max_consecutive_posts_per_user;
    let window = config.spacing_window_size;
    let mut violations = Vec::new();

    let mut run_len = 0usize;
    for i in 0..posts.len() {
        if i > 0 && posts[i].post.author_id == posts[i - 1].post.author_id {
            run_len += 1;
        } else {
            run_len = 1;
        }

        if posts[i].spacing_penalty_applied {
            continue;
        }

        if run_len > limit {
            violations.push((i, true));
            continue;
        }

        // Window density: same author appearing too often in the trailing
        // window even without a strict run.
        let start = i.saturating_sub(window - 1);
        let in_window = posts[start..=i]
            .iter()
            .filter(|p| p.post.author_id == posts[i].post.author_id)
            .count();
        if in_window > limit {
            violations.push((i, false));
        }
    }
    violations
}
