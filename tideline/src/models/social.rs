use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowStatus {
    Active,
    Pending,
    Blocked,
}

/// One edge of the follow graph. Only `Active` edges count toward
/// relationship multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower_id: String,
    pub followed_id: String,
    pub status: FollowStatus,
    pub created_at: DateTime<Utc>,
}

impl FollowEdge {
    pub fn active(
        follower_id: impl Into<String>,
        followed_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            follower_id: follower_id.into(),
            followed_id: followed_id.into(),
            status: FollowStatus::Active,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == FollowStatus::Active
    }
}

/// A single viewer-to-author interaction, aggregated over a rolling window to
/// detect frequent interactors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub viewer_id: String,
    pub author_id: String,
    pub kind: String,
    pub weight: f64,
    pub occurred_at: DateTime<Utc>,
}

/// Per-viewer read-status summary exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadSummary {
    pub viewer_id: String,
    pub session_read_count: usize,
    pub last_feed_view: Option<DateTime<Utc>>,
}

/// Classification of a post for a given viewer at scoring time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadState {
    /// Created after the viewer's last acknowledged feed view and not yet
    /// read in this session.
    Unread,
    /// Marked read in the current session.
    ReadInSession,
    /// Neither fresh nor session-read.
    Seen,
}
