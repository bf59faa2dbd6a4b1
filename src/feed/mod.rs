//! Feed Module
//!
//! Cached views and invalidating mutations over the social feed data.

mod repository;
mod service;

pub use repository::{MemoryRepository, PostQuery, Repository};
pub use service::{FeedService, SEARCH_LIMIT};
