use serde::{Deserialize, Serialize};

use super::ScoredPost;

/// One feed-ranking request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRequest {
    pub viewer_id: String,
    pub limit: usize,
    pub offset: usize,
    /// When false the feed is pure reverse-chronological.
    pub algorithm_enabled: bool,
    /// When false read/unread state does not affect scores.
    pub consider_read_status: bool,
    /// Prioritize posts created after the viewer's last acknowledged view.
    pub refresh_mode: bool,
}

impl FeedRequest {
    pub fn new(viewer_id: impl Into<String>, limit: usize, offset: usize) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            limit,
            offset,
            algorithm_enabled: true,
            consider_read_status: true,
            refresh_mode: false,
        }
    }
}

/// One page of ranked feed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub posts: Vec<ScoredPost>,
    /// Count of all public posts, independent of the ranking pass.
    pub total_count: u64,
    pub elapsed_ms: u64,
}
