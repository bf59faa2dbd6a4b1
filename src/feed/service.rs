//! Feed Service
//!
//! The cache's call sites. Views follow read-through: try the cache, on a
//! miss read the repository and populate the cache with the view's TTL.
//! Mutations write to the repository first and only then invalidate.

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{keys, CacheKey, InvalidationPolicy, InvalidationReport, Mutation, ResponseCache};
use crate::config::{Config, ViewTtls};
use crate::error::{Result, ServiceError};
use crate::feed::{PostQuery, Repository};
use crate::models::{
    BookmarkOutcome, Comment, FollowOutcome, LikeOutcome, NewPost, NewUser, Post, PostUpdate,
    ProfileUpdate, UserProfile, UserSummary, ViewResponse, Visibility,
};

/// Most users a search returns.
pub const SEARCH_LIMIT: usize = 50;

// == Feed Service ==
pub struct FeedService<R: ?Sized> {
    cache: ResponseCache,
    repo: Arc<R>,
    policy: InvalidationPolicy,
    ttls: ViewTtls,
}

impl<R: Repository + ?Sized> FeedService<R> {
    pub fn new(cache: ResponseCache, repo: Arc<R>, config: &Config) -> Self {
        Self {
            cache,
            repo,
            policy: InvalidationPolicy::new(config.strict_follow_invalidation, config.ttls.profile),
            ttls: config.ttls.clone(),
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    // == Read-through ==
    async fn read_through<T, Fut>(
        &self,
        key: &CacheKey,
        ttl: u64,
        fetch: impl FnOnce() -> Fut,
    ) -> Result<ViewResponse<T>>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.cache.get_as::<T>(key) {
            debug!(key = %key, "Served from cache");
            return Ok(ViewResponse::cached(hit));
        }

        let fresh = fetch().await?;
        self.cache.set_json(key, &fresh, Some(ttl));
        Ok(ViewResponse::fresh(fresh))
    }

    fn invalidate(&self, mutation: Mutation<'_>) -> InvalidationReport {
        self.policy.apply(&self.cache, &mutation)
    }

    async fn require_user(&self, user_id: &str) -> Result<UserProfile> {
        self.repo
            .find_user(user_id)
            .await?
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn require_post(&self, post_id: &str) -> Result<Post> {
        self.repo
            .find_post(post_id)
            .await?
            .ok_or_else(|| post_not_found(post_id))
    }

    // == Views ==
    /// Posts the viewer may see within the `visibility` scope, newest first.
    /// Signed-in viewers also get followers-only posts of users they follow
    /// and their own private posts under the `Public` scope.
    ///
    /// When the database fails, the anonymous public listing is served from
    /// cache instead, flagged as degraded.
    pub async fn all_posts(
        &self,
        viewer_id: Option<&str>,
        visibility: Visibility,
    ) -> Result<ViewResponse<Vec<Post>>> {
        let key = keys::all_posts(viewer_id, visibility);
        let ttl = match viewer_id {
            Some(_) => self.ttls.posts,
            None => self.ttls.public_posts,
        };

        let result = self
            .read_through(&key, ttl, || async {
                let following = match viewer_id {
                    Some(id) => self.require_user(id).await?.following,
                    None => Vec::new(),
                };
                let query = PostQuery::VisibleTo {
                    viewer_id: viewer_id.map(str::to_string),
                    following,
                    visibility,
                };
                self.repo.find_posts(&query).await
            })
            .await;

        match result {
            Err(ServiceError::Database(reason)) => {
                error!(key = %key, reason = %reason, "Error fetching posts");
                let fallback = keys::all_posts(None, Visibility::Public);
                match self.cache.get_as::<Vec<Post>>(&fallback) {
                    Some(stale) => {
                        warn!(key = %key, fallback = %fallback, "Serving cached public posts");
                        Ok(ViewResponse::degraded(stale))
                    }
                    None => Err(ServiceError::Database(reason)),
                }
            }
            other => other,
        }
    }

    pub async fn single_post(&self, post_id: &str) -> Result<ViewResponse<Post>> {
        self.read_through(&keys::single_post(post_id), self.ttls.single_post, || {
            self.require_post(post_id)
        })
        .await
    }

    /// Public posts by the users `viewer_id` follows, newest first.
    pub async fn following_feed(&self, viewer_id: &str) -> Result<ViewResponse<Vec<Post>>> {
        let key = keys::following_feed(viewer_id);
        self.read_through(&key, self.ttls.following_feed, || async {
            let viewer = self.require_user(viewer_id).await?;
            if viewer.following.is_empty() {
                return Ok(Vec::new());
            }
            self.repo
                .find_posts(&PostQuery::PublicByOwners {
                    owners: viewer.following,
                })
                .await
        })
        .await
    }

    pub async fn user_profile(&self, user_id: &str) -> Result<ViewResponse<UserProfile>> {
        self.read_through(&keys::user_profile(user_id), self.ttls.profile, || {
            self.require_user(user_id)
        })
        .await
    }

    /// Every user except the requester, newest first.
    ///
    /// The list is cached once for everybody; the requester is filtered out
    /// per call.
    pub async fn users_list(&self, requester_id: &str) -> Result<ViewResponse<Vec<UserSummary>>> {
        let view = self
            .read_through(&keys::users_list(), self.ttls.users_list, || {
                self.repo.list_users()
            })
            .await?;

        Ok(view.map(|users| {
            users
                .into_iter()
                .filter(|user| user.id != requester_id)
                .collect()
        }))
    }

    /// Users whose name or username contains `term`, case-insensitively.
    ///
    /// Results are not invalidated by writes; the short TTL bounds staleness.
    pub async fn search_users(
        &self,
        term: &str,
        requester_id: &str,
    ) -> Result<ViewResponse<Vec<UserSummary>>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Search term cannot be empty".to_string(),
            ));
        }

        let key = keys::search(&term, requester_id);
        self.read_through(&key, self.ttls.search, || async {
            self.require_user(requester_id).await?;
            self.repo
                .search_users(&term, requester_id, SEARCH_LIMIT)
                .await
        })
        .await
    }

    // == Mutations ==
    pub async fn register_user(&self, user: NewUser) -> Result<UserProfile> {
        if user.username.trim().is_empty() || user.name.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Username and name are required".to_string(),
            ));
        }

        let profile = self.repo.insert_user(user).await?;
        self.invalidate(Mutation::UserRegistered {
            user_id: &profile.id,
        });

        info!(user_id = %profile.id, "User registered");
        Ok(profile)
    }

    pub async fn create_post(&self, author_id: &str, post: NewPost) -> Result<Post> {
        if post.content.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Post content cannot be empty".to_string(),
            ));
        }

        let author = self.require_user(author_id).await?;
        let created = self.repo.insert_post(&author, post).await?;
        self.invalidate(Mutation::PostCreated {
            actor_id: author_id,
            post_id: &created.id,
        });

        info!(post_id = %created.id, author_id, "Post created");
        Ok(created)
    }

    /// Edits a post. Only its owner may do so.
    pub async fn update_post(
        &self,
        actor_id: &str,
        post_id: &str,
        update: PostUpdate,
    ) -> Result<Post> {
        if update.content.as_deref().map(str::trim) == Some("") {
            return Err(ServiceError::InvalidRequest(
                "Post content cannot be empty".to_string(),
            ));
        }

        let post = self.require_post(post_id).await?;
        ensure_owner(&post, actor_id)?;

        let updated = self
            .repo
            .update_post(post_id, &update)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;
        self.invalidate(Mutation::PostUpdated { actor_id, post_id });
        Ok(updated)
    }

    /// Deletes a post. Only its owner may do so.
    pub async fn delete_post(&self, actor_id: &str, post_id: &str) -> Result<()> {
        let post = self.require_post(post_id).await?;
        ensure_owner(&post, actor_id)?;

        self.repo.delete_post(post_id).await?;
        self.invalidate(Mutation::PostDeleted { actor_id, post_id });

        info!(post_id, actor_id, "Post deleted");
        Ok(())
    }

    pub async fn add_comment(&self, actor_id: &str, post_id: &str, text: &str) -> Result<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Comment text is required".to_string(),
            ));
        }

        self.require_user(actor_id).await?;
        let comment = self
            .repo
            .push_comment(post_id, actor_id, text)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;

        self.invalidate(Mutation::PostUpdated { actor_id, post_id });
        Ok(comment)
    }

    /// Removes a comment. Its author and the post owner may do so.
    pub async fn delete_comment(
        &self,
        actor_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> Result<()> {
        let post = self.require_post(post_id).await?;
        let comment = post
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .ok_or_else(|| comment_not_found(comment_id))?;

        if comment.user != actor_id && post.owner.id != actor_id {
            return Err(ServiceError::Forbidden(format!(
                "User '{}' may not delete comment '{}'",
                actor_id, comment_id
            )));
        }

        if !self.repo.pull_comment(post_id, comment_id).await? {
            return Err(comment_not_found(comment_id));
        }
        self.invalidate(Mutation::PostUpdated { actor_id, post_id });
        Ok(())
    }

    pub async fn toggle_like(&self, actor_id: &str, post_id: &str) -> Result<LikeOutcome> {
        let outcome = self
            .repo
            .toggle_like(post_id, actor_id)
            .await?
            .ok_or_else(|| post_not_found(post_id))?;

        self.invalidate(Mutation::PostUpdated { actor_id, post_id });
        Ok(outcome)
    }

    pub async fn toggle_bookmark(&self, actor_id: &str, post_id: &str) -> Result<BookmarkOutcome> {
        let outcome = self
            .repo
            .toggle_bookmark(actor_id, post_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("User '{}' or post '{}'", actor_id, post_id))
            })?;

        self.invalidate(Mutation::PostUpdated { actor_id, post_id });
        Ok(outcome)
    }

    /// Applies a profile edit and refreshes the cached profile in place.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<UserProfile> {
        if update.is_empty() {
            return Err(ServiceError::InvalidRequest("No fields to update".to_string()));
        }
        let update = ProfileUpdate {
            name: update.name.map(|name| name.trim().to_string()),
            ..update
        };
        if update.name.as_deref() == Some("") {
            return Err(ServiceError::InvalidRequest("Name cannot be empty".to_string()));
        }

        let user = self
            .repo
            .update_profile(user_id, &update)
            .await?
            .ok_or_else(|| user_not_found(user_id))?;

        self.invalidate(Mutation::ProfileUpdated {
            user_id,
            fresh: Some(&user),
        });
        Ok(user)
    }

    /// Follows `followee_id`, or unfollows if already following.
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<FollowOutcome> {
        if follower_id == followee_id {
            return Err(ServiceError::InvalidRequest(
                "Users cannot follow themselves".to_string(),
            ));
        }

        let outcome = self
            .repo
            .toggle_follow(follower_id, followee_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("User '{}' or '{}'", follower_id, followee_id))
            })?;

        self.invalidate(Mutation::FollowChanged {
            follower_id,
            followee_id,
        });
        Ok(outcome)
    }
}

fn user_not_found(user_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("User '{}'", user_id))
}

fn post_not_found(post_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Post '{}'", post_id))
}

fn comment_not_found(comment_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("Comment '{}'", comment_id))
}

fn ensure_owner(post: &Post, actor_id: &str) -> Result<()> {
    if post.owner.id == actor_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "User '{}' does not own post '{}'",
            actor_id, post.id
        )))
    }
}
