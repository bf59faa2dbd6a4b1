//! Domain records, mutation inputs and response shapes
//!
//! Shared by the cache views, the feed service and the admin API.

pub mod domain;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use domain::{Comment, Post, UserProfile, UserSummary, Visibility};
pub use requests::{FlushQuery, NewPost, NewUser, PostUpdate, ProfileUpdate};
pub use responses::{
    BookmarkOutcome, DeleteResponse, EntryResponse, FlushResponse, FollowOutcome,
    HealthResponse, LikeOutcome, StatsResponse, ViewResponse, FALLBACK_WARNING,
};
