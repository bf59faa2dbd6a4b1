//! Cache Key Module
//!
//! Typed builders for the `<entity>:<view>:<scope>:<id>` key namespace.
//! Call sites never format key strings themselves; they ask for a view's key
//! here so producers and consumers always agree on its shape.

use std::fmt;

use crate::models::Visibility;

// == Prefixes ==
/// Every post view: listings, single posts and following feeds.
pub const POSTS_PREFIX: &str = "post:";
/// Following feeds of all viewers.
pub const FOLLOWING_FEEDS_PREFIX: &str = "post:following:";
/// Search results of all requesters.
const SEARCHES_PREFIX: &str = "user:search:";

/// Scope used for listings requested without a caller identity.
pub const ANONYMOUS: &str = "anonymous";

// == Cache Key ==
/// Opaque cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wraps an arbitrary key string.
    ///
    /// For ad hoc and administrative access; views use the builders below.
    pub fn custom(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// True when this key falls under `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Builders ==
/// `user:profile:{user_id}`
pub fn user_profile(user_id: &str) -> CacheKey {
    CacheKey(format!("user:profile:{}", user_id))
}

/// `user:list`
pub fn users_list() -> CacheKey {
    CacheKey("user:list".to_string())
}

/// `post:all:{visibility}:{viewer_id or "anonymous"}`
pub fn all_posts(viewer_id: Option<&str>, visibility: Visibility) -> CacheKey {
    CacheKey(format!(
        "post:all:{}:{}",
        visibility.as_str(),
        viewer_id.unwrap_or(ANONYMOUS)
    ))
}

/// `post:single:{post_id}`
pub fn single_post(post_id: &str) -> CacheKey {
    CacheKey(format!("post:single:{}", post_id))
}

/// `post:following:{viewer_id}`
pub fn following_feed(viewer_id: &str) -> CacheKey {
    CacheKey(format!("{}{}", FOLLOWING_FEEDS_PREFIX, viewer_id))
}

/// `user:search:{term}:{requester_id}`, with `%` and `:` percent-encoded in
/// both segments so distinct pairs never share a key.
pub fn search(term: &str, requester_id: &str) -> CacheKey {
    CacheKey(format!(
        "{}{}:{}",
        SEARCHES_PREFIX,
        escape_segment(term),
        escape_segment(requester_id)
    ))
}

fn escape_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace(':', "%3A")
}
