mod diversity;
mod feed;
mod read_status;
mod relationship;
mod scoring;
mod time_bucket;

pub use diversity::DiversityEnforcer;
pub use feed::FeedService;
pub use read_status::{ReadStatusTracker, SessionReadStore};
pub use relationship::{RelationshipResolver, RelationshipSnapshot};
pub use scoring::{sort_by_score_desc, ScoreCtx, ScoringEngine};
pub use time_bucket::{TimeBucket, TimeBucketTable};
