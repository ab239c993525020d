use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Daily,
    Photo,
    Spontaneous,
}

/// Immutable snapshot of a candidate post, read once per ranking pass. The
/// persistence layer owns these; the engine never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePost {
    pub id: String,
    pub author_id: String,
    pub content_type: ContentType,
    /// Missing creation time scores with a neutral time multiplier.
    pub created_at: Option<DateTime<Utc>>,
    pub is_public: bool,
}

impl CandidatePost {
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        content_type: ContentType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            content_type,
            created_at: Some(created_at),
            is_public: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub hearts: u64,
    pub reactions: u64,
    pub shares: u64,
}

impl EngagementCounts {
    pub fn new(hearts: u64, reactions: u64, shares: u64) -> Self {
        Self {
            hearts,
            reactions,
            shares,
        }
    }
}

/// Every multiplier that went into a final score, kept for serialization and
/// for reproducing a score from its immutable inputs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub engagement: f64,
    pub content: f64,
    pub time: f64,
    pub relationship: f64,
    pub unread: f64,
    pub mention: f64,
    pub own_post: f64,
}

impl ScoreBreakdown {
    pub fn neutral() -> Self {
        Self {
            engagement: 1.0,
            content: 1.0,
            time: 1.0,
            relationship: 1.0,
            unread: 1.0,
            mention: 1.0,
            own_post: 1.0,
        }
    }

    pub fn product(&self) -> f64 {
        self.engagement
            * self.content
            * self.time
            * self.relationship
            * self.unread
            * self.mention
            * self.own_post
    }
}

/// A candidate post with its computed score and diversity annotations.
/// Created fresh per ranking pass, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPost {
    pub post: CandidatePost,
    pub breakdown: ScoreBreakdown,
    pub score: f64,
    pub is_own_post: bool,
    pub unread: bool,
    pub spacing_penalty_applied: bool,
}
