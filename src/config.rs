//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Per-view TTLs in seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTtls {
    pub profile: u64,
    pub users_list: u64,
    /// Post listing for an authenticated viewer
    pub posts: u64,
    /// Post listing for an anonymous viewer
    pub public_posts: u64,
    pub single_post: u64,
    pub following_feed: u64,
    pub search: u64,
}

impl Default for ViewTtls {
    fn default() -> Self {
        Self {
            profile: 300,
            users_list: 300,
            posts: 300,
            public_posts: 600,
            single_post: 300,
            following_feed: 180,
            search: 180,
        }
    }
}

/// Cache and admin server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Expiry sweep interval in seconds
    pub sweep_interval: u64,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Drop profile caches on follow/unfollow instead of waiting for TTL
    pub strict_follow_invalidation: bool,
    pub ttls: ViewTtls,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 2000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 120)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    /// - `STRICT_FOLLOW_INVALIDATION` - `true`/`false` (default: false)
    /// - `PROFILE_TTL`, `USERS_LIST_TTL`, `POSTS_TTL`, `PUBLIC_POSTS_TTL`,
    ///   `SINGLE_POST_TTL`, `FOLLOWING_FEED_TTL`, `SEARCH_TTL` - view TTLs
    ///   in seconds (defaults: 300, 300, 300, 600, 300, 180, 180)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any name-to-value source, using the same
    /// variable names and defaults as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let ttls = defaults.ttls.clone();

        Self {
            max_entries: parse_or(lookup("MAX_ENTRIES"), defaults.max_entries),
            default_ttl: parse_or(lookup("DEFAULT_TTL"), defaults.default_ttl),
            sweep_interval: parse_or(lookup("SWEEP_INTERVAL"), defaults.sweep_interval),
            server_port: parse_or(lookup("SERVER_PORT"), defaults.server_port),
            strict_follow_invalidation: parse_or(
                lookup("STRICT_FOLLOW_INVALIDATION"),
                defaults.strict_follow_invalidation,
            ),
            ttls: ViewTtls {
                profile: parse_or(lookup("PROFILE_TTL"), ttls.profile),
                users_list: parse_or(lookup("USERS_LIST_TTL"), ttls.users_list),
                posts: parse_or(lookup("POSTS_TTL"), ttls.posts),
                public_posts: parse_or(lookup("PUBLIC_POSTS_TTL"), ttls.public_posts),
                single_post: parse_or(lookup("SINGLE_POST_TTL"), ttls.single_post),
                following_feed: parse_or(lookup("FOLLOWING_FEED_TTL"), ttls.following_feed),
                search: parse_or(lookup("SEARCH_TTL"), ttls.search),
            },
        }
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 2000,
            default_ttl: 300,
            sweep_interval: 120,
            server_port: 3000,
            strict_follow_invalidation: false,
            ttls: ViewTtls::default(),
        }
    }
}
