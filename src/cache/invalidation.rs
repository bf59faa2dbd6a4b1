//! Invalidation Policy
//!
//! Decides which cached views a mutation makes stale. Search results are not
//! covered here; their short TTL bounds their staleness.

use tracing::debug;

use crate::cache::keys::{self, FOLLOWING_FEEDS_PREFIX, POSTS_PREFIX};
use crate::cache::ResponseCache;
use crate::models::UserProfile;

// == Mutation ==
/// A write that has already reached the database.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    /// `actor_id` created post `post_id`
    PostCreated { actor_id: &'a str, post_id: &'a str },
    /// `actor_id` edited, liked, commented on or bookmarked post `post_id`
    PostUpdated { actor_id: &'a str, post_id: &'a str },
    /// `actor_id` deleted post `post_id`
    PostDeleted { actor_id: &'a str, post_id: &'a str },
    /// Profile fields of `user_id` changed. `fresh` is the new projection
    /// when the caller already has it.
    ProfileUpdated {
        user_id: &'a str,
        fresh: Option<&'a UserProfile>,
    },
    /// A new account exists
    UserRegistered { user_id: &'a str },
    /// `follower_id` started or stopped following `followee_id`
    FollowChanged {
        follower_id: &'a str,
        followee_id: &'a str,
    },
}

// == Invalidation Report ==
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationReport {
    /// Entries removed
    pub removed: usize,
    /// Entries overwritten with fresh data instead of removed
    pub refreshed: usize,
}

// == Invalidation Policy ==
#[derive(Debug, Clone)]
pub struct InvalidationPolicy {
    /// Also drop both profiles and the follower's feed on follow changes
    pub strict_follow: bool,
    /// TTL used when a profile is overwritten in place
    pub profile_ttl: u64,
}

impl Default for InvalidationPolicy {
    fn default() -> Self {
        Self {
            strict_follow: false,
            profile_ttl: 300,
        }
    }
}

impl InvalidationPolicy {
    pub fn new(strict_follow: bool, profile_ttl: u64) -> Self {
        Self {
            strict_follow,
            profile_ttl,
        }
    }

    /// Applies the rules for `mutation` to `cache`.
    pub fn apply(&self, cache: &ResponseCache, mutation: &Mutation<'_>) -> InvalidationReport {
        let mut report = InvalidationReport::default();

        match *mutation {
            Mutation::PostCreated { actor_id, post_id }
            | Mutation::PostUpdated { actor_id, post_id }
            | Mutation::PostDeleted { actor_id, post_id } => {
                // Any listing or feed may include or exclude the post
                report.removed += cache.delete(&keys::single_post(post_id)) as usize;
                report.removed += cache.delete_prefix(POSTS_PREFIX);
                report.removed += cache.delete(&keys::user_profile(actor_id)) as usize;
            }
            Mutation::ProfileUpdated { user_id, fresh } => {
                let profile_key = keys::user_profile(user_id);
                match fresh {
                    Some(profile) => {
                        cache.set_json(&profile_key, profile, Some(self.profile_ttl));
                        report.refreshed += 1;
                    }
                    None => report.removed += cache.delete(&profile_key) as usize,
                }
                report.removed += cache.delete(&keys::users_list()) as usize;
                // Feeds embed owner name and avatar
                report.removed += cache.delete_prefix(FOLLOWING_FEEDS_PREFIX);
            }
            Mutation::UserRegistered { .. } => {
                report.removed += cache.delete(&keys::users_list()) as usize;
            }
            Mutation::FollowChanged {
                follower_id,
                followee_id,
            } => {
                if self.strict_follow {
                    report.removed += cache.delete(&keys::user_profile(follower_id)) as usize;
                    report.removed += cache.delete(&keys::user_profile(followee_id)) as usize;
                    report.removed += cache.delete(&keys::following_feed(follower_id)) as usize;
                }
            }
        }

        debug!(
            mutation = ?mutation,
            removed = report.removed,
            refreshed = report.refreshed,
            "Applied cache invalidation"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::models::Visibility;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn cache() -> ResponseCache {
        ResponseCache::with_clock(100, 300, Arc::new(ManualClock::new(0)))
    }

    fn profile(id: &str, name: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            username: id.to_string(),
            name: name.to_string(),
            avatar: String::new(),
            cover_img: String::new(),
            about: String::new(),
            location: String::new(),
            link: String::new(),
            followers: vec![],
            following: vec![],
            bookmarks: vec![],
            created_at: Utc::now(),
        }
    }

    fn populate(cache: &ResponseCache) {
        cache.set(&keys::all_posts(None, Visibility::Public), json!([]), None);
        cache.set(&keys::all_posts(Some("u2"), Visibility::Public), json!([]), None);
        cache.set(&keys::following_feed("u2"), json!([]), None);
        cache.set(&keys::following_feed("u3"), json!([]), None);
        cache.set(&keys::single_post("p1"), json!({}), None);
        cache.set(&keys::user_profile("u1"), json!({}), None);
        cache.set(&keys::user_profile("u2"), json!({}), None);
        cache.set(&keys::users_list(), json!([]), None);
        cache.set(&keys::search("ad", "u2"), json!([]), None);
    }

    #[test]
    fn test_post_created_drops_all_post_views_and_author_profile() {
        let cache = cache();
        populate(&cache);

        let report = InvalidationPolicy::default().apply(
            &cache,
            &Mutation::PostCreated {
                actor_id: "u1",
                post_id: "p2",
            },
        );

        assert_eq!(report.removed, 6);
        assert!(cache.get(&keys::all_posts(None, Visibility::Public)).is_none());
        assert!(cache.get(&keys::all_posts(Some("u2"), Visibility::Public)).is_none());
        assert!(cache.get(&keys::following_feed("u2")).is_none());
        assert!(cache.get(&keys::following_feed("u3")).is_none());
        assert!(cache.get(&keys::single_post("p1")).is_none());
        assert!(cache.get(&keys::user_profile("u1")).is_none());
        // Untouched
        assert!(cache.get(&keys::user_profile("u2")).is_some());
        assert!(cache.get(&keys::users_list()).is_some());
        assert!(cache.get(&keys::search("ad", "u2")).is_some());
    }

    #[test]
    fn test_profile_update_overwrites_when_fresh_given() {
        let cache = cache();
        populate(&cache);
        let fresh = profile("u1", "Ada Lovelace");

        let report = InvalidationPolicy::default().apply(
            &cache,
            &Mutation::ProfileUpdated {
                user_id: "u1",
                fresh: Some(&fresh),
            },
        );

        assert_eq!(report.refreshed, 1);
        // users list + two following feeds
        assert_eq!(report.removed, 3);
        let cached: UserProfile = cache.get_as(&keys::user_profile("u1")).unwrap();
        assert_eq!(cached.name, "Ada Lovelace");
        assert!(cache.get(&keys::users_list()).is_none());
        assert!(cache.get(&keys::following_feed("u2")).is_none());
        assert!(cache.get(&keys::all_posts(None, Visibility::Public)).is_some());
    }

    #[test]
    fn test_profile_update_deletes_without_fresh() {
        let cache = cache();
        populate(&cache);

        InvalidationPolicy::default().apply(
            &cache,
            &Mutation::ProfileUpdated {
                user_id: "u1",
                fresh: None,
            },
        );

        assert!(cache.get(&keys::user_profile("u1")).is_none());
    }

    #[test]
    fn test_user_registered_drops_users_list() {
        let cache = cache();
        populate(&cache);

        let report =
            InvalidationPolicy::default().apply(&cache, &Mutation::UserRegistered { user_id: "u9" });

        assert_eq!(report.removed, 1);
        assert!(cache.get(&keys::users_list()).is_none());
    }

    #[test]
    fn test_follow_relies_on_ttl_by_default() {
        let cache = cache();
        populate(&cache);

        let report = InvalidationPolicy::default().apply(
            &cache,
            &Mutation::FollowChanged {
                follower_id: "u2",
                followee_id: "u1",
            },
        );

        assert_eq!(report, InvalidationReport::default());
        assert!(cache.get(&keys::user_profile("u1")).is_some());
    }

    #[test]
    fn test_strict_follow_drops_both_profiles() {
        let cache = cache();
        populate(&cache);

        let report = InvalidationPolicy::new(true, 300).apply(
            &cache,
            &Mutation::FollowChanged {
                follower_id: "u2",
                followee_id: "u1",
            },
        );

        assert_eq!(report.removed, 3);
        assert!(cache.get(&keys::user_profile("u1")).is_none());
        assert!(cache.get(&keys::user_profile("u2")).is_none());
        assert!(cache.get(&keys::following_feed("u2")).is_none());
        assert!(cache.get(&keys::following_feed("u3")).is_some());
    }
}
