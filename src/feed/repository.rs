//! Repository seam
//!
//! The document database as the feed service sees it. Production wires a
//! real store behind [`Repository`]; [`MemoryRepository`] backs the tests
//! and can simulate an outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{Result, ServiceError};
use crate::models::{
    BookmarkOutcome, Comment, FollowOutcome, LikeOutcome, NewPost, NewUser, Post, PostUpdate,
    ProfileUpdate, UserProfile, UserSummary, Visibility,
};

// == Post Query ==
/// Filter the service asks the database to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostQuery {
    /// Posts `viewer_id` may see, newest first. Followers-only posts need
    /// the owner in `following`; private posts need the viewer to be the
    /// owner. The `Public` scope lists everything visible, narrower scopes
    /// only posts of exactly that visibility.
    VisibleTo {
        viewer_id: Option<String>,
        following: Vec<String>,
        visibility: Visibility,
    },
    /// Public posts by any of `owners`
    PublicByOwners { owners: Vec<String> },
}

impl PostQuery {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostQuery::VisibleTo {
                viewer_id,
                following,
                visibility,
            } => {
                let in_scope =
                    *visibility == Visibility::Public || post.visibility == *visibility;
                let is_owner = viewer_id.as_deref() == Some(post.owner.id.as_str());
                let may_see = match post.visibility {
                    Visibility::Public => true,
                    Visibility::Followers => {
                        is_owner || (viewer_id.is_some() && following.contains(&post.owner.id))
                    }
                    Visibility::Private => is_owner,
                };
                in_scope && may_see
            }
            PostQuery::PublicByOwners { owners } => {
                post.visibility == Visibility::Public && owners.contains(&post.owner.id)
            }
        }
    }
}

// == Repository Trait ==
/// Every write is a single atomic update on the stored record, so concurrent
/// callers never overwrite each other's changes.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>>;
    /// All users, newest first
    async fn list_users(&self) -> Result<Vec<UserSummary>>;
    /// Case-insensitive match on name or username, excluding `exclude_id`
    async fn search_users(
        &self,
        term: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<UserSummary>>;
    async fn insert_user(&self, user: NewUser) -> Result<UserProfile>;
    /// `None` when the user does not exist
    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>>;
    /// Flips the follow edge on both users in one write. `None` when either
    /// user does not exist.
    async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<Option<FollowOutcome>>;
    /// `None` when the user or the post does not exist
    async fn toggle_bookmark(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<BookmarkOutcome>>;

    async fn find_post(&self, post_id: &str) -> Result<Option<Post>>;
    /// Matching posts with owners populated, newest first
    async fn find_posts(&self, query: &PostQuery) -> Result<Vec<Post>>;
    async fn insert_post(&self, owner: &UserProfile, post: NewPost) -> Result<Post>;
    /// `None` when the post does not exist
    async fn update_post(&self, post_id: &str, update: &PostUpdate) -> Result<Option<Post>>;
    async fn delete_post(&self, post_id: &str) -> Result<bool>;
    /// `None` when the post does not exist
    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<Option<LikeOutcome>>;
    /// Appends a comment with a fresh id. `None` when the post does not exist.
    async fn push_comment(
        &self,
        post_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<Option<Comment>>;
    /// Whether the comment existed and was removed
    async fn pull_comment(&self, post_id: &str, comment_id: &str) -> Result<bool>;
}

// == Memory Repository ==
#[derive(Debug, Default)]
pub struct MemoryRepository {
    users: RwLock<HashMap<String, UserProfile>>,
    posts: RwLock<HashMap<String, Post>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with [`ServiceError::Database`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of read calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ServiceError::Database("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> Result<()> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Refreshes the denormalized owner, as a populate at read time would.
    fn populate(&self, mut post: Post) -> Post {
        if let Some(owner) = self.users.read().get(&post.owner.id) {
            post.owner = owner.summary();
        }
        post
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.read()?;
        Ok(self.users.read().get(user_id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        self.read()?;
        let users = self.users.read();
        let mut profiles: Vec<&UserProfile> = users.values().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(profiles.into_iter().map(UserProfile::summary).collect())
    }

    async fn search_users(
        &self,
        term: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<UserSummary>> {
        self.read()?;
        let needle = term.to_lowercase();
        let users = self.users.read();
        let mut matches: Vec<UserSummary> = users
            .values()
            .filter(|user| user.id != exclude_id)
            .filter(|user| {
                user.name.to_lowercase().contains(&needle)
                    || user.username.to_lowercase().contains(&needle)
            })
            .map(UserProfile::summary)
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserProfile> {
        self.check()?;
        let mut users = self.users.write();
        if users.values().any(|u| u.username == user.username) {
            return Err(ServiceError::InvalidRequest(format!(
                "Username '{}' is taken",
                user.username
            )));
        }

        let profile = UserProfile {
            id: self.next_id("u"),
            username: user.username,
            name: user.name,
            avatar: String::new(),
            cover_img: String::new(),
            about: String::new(),
            location: String::new(),
            link: String::new(),
            followers: vec![],
            following: vec![],
            bookmarks: vec![],
            created_at: Utc::now(),
        };
        users.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>> {
        self.check()?;
        let mut users = self.users.write();
        Ok(users.get_mut(user_id).map(|user| {
            update.apply_to(user);
            user.clone()
        }))
    }

    async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<Option<FollowOutcome>> {
        self.check()?;
        let mut users = self.users.write();
        if !users.contains_key(follower_id) || !users.contains_key(followee_id) {
            return Ok(None);
        }

        let following = match users.get_mut(follower_id) {
            Some(follower) if follower.follows(followee_id) => {
                follower.following.retain(|id| id != followee_id);
                false
            }
            Some(follower) => {
                follower.following.push(followee_id.to_string());
                true
            }
            None => return Ok(None),
        };

        let follower_count = match users.get_mut(followee_id) {
            Some(followee) => {
                followee.followers.retain(|id| id != follower_id);
                if following {
                    followee.followers.push(follower_id.to_string());
                }
                followee.followers.len()
            }
            None => return Ok(None),
        };

        Ok(Some(FollowOutcome {
            following,
            follower_count,
        }))
    }

    async fn toggle_bookmark(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<BookmarkOutcome>> {
        self.check()?;
        let post_exists = self.posts.read().contains_key(post_id);
        if !post_exists {
            return Ok(None);
        }

        let mut users = self.users.write();
        Ok(users.get_mut(user_id).map(|user| {
            let bookmarked = toggle_member(&mut user.bookmarks, post_id);
            BookmarkOutcome { bookmarked }
        }))
    }

    async fn find_post(&self, post_id: &str) -> Result<Option<Post>> {
        self.read()?;
        let post = self.posts.read().get(post_id).cloned();
        Ok(post.map(|post| self.populate(post)))
    }

    async fn find_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        self.read()?;
        let mut matching: Vec<Post> = self
            .posts
            .read()
            .values()
            .filter(|post| query.matches(post))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching.into_iter().map(|post| self.populate(post)).collect())
    }

    async fn insert_post(&self, owner: &UserProfile, post: NewPost) -> Result<Post> {
        self.check()?;
        let post = Post {
            id: self.next_id("p"),
            owner: owner.summary(),
            content: post.content,
            tags: post.tags,
            visibility: post.visibility,
            likes: vec![],
            comments: vec![],
            created_at: Utc::now(),
        };
        self.posts.write().insert(post.id.clone(), post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: &str, update: &PostUpdate) -> Result<Option<Post>> {
        self.check()?;
        let updated = self.posts.write().get_mut(post_id).map(|post| {
            update.apply_to(post);
            post.clone()
        });
        Ok(updated.map(|post| self.populate(post)))
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool> {
        self.check()?;
        Ok(self.posts.write().remove(post_id).is_some())
    }

    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<Option<LikeOutcome>> {
        self.check()?;
        let mut posts = self.posts.write();
        Ok(posts.get_mut(post_id).map(|post| {
            let liked = toggle_member(&mut post.likes, user_id);
            LikeOutcome {
                liked,
                like_count: post.likes.len(),
            }
        }))
    }

    async fn push_comment(
        &self,
        post_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<Option<Comment>> {
        self.check()?;
        let mut posts = self.posts.write();
        Ok(posts.get_mut(post_id).map(|post| {
            let comment = Comment {
                id: self.next_id("c"),
                user: user_id.to_string(),
                comment: text.to_string(),
                created_at: Utc::now(),
            };
            post.comments.push(comment.clone());
            comment
        }))
    }

    async fn pull_comment(&self, post_id: &str, comment_id: &str) -> Result<bool> {
        self.check()?;
        let mut posts = self.posts.write();
        Ok(match posts.get_mut(post_id) {
            Some(post) => {
                let before = post.comments.len();
                post.comments.retain(|comment| comment.id != comment_id);
                post.comments.len() < before
            }
            None => false,
        })
    }
}

/// Removes `id` if present, otherwise adds it. Returns whether it is now present.
fn toggle_member(ids: &mut Vec<String>, id: &str) -> bool {
    if ids.iter().any(|existing| existing == id) {
        ids.retain(|existing| existing != id);
        false
    } else {
        ids.push(id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, name: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            name: name.to_string(),
        }
    }

    fn new_post(content: &str, visibility: Visibility) -> NewPost {
        NewPost {
            content: content.to_string(),
            tags: vec![],
            visibility,
        }
    }

    #[tokio::test]
    async fn test_visibility_query() {
        let repo = MemoryRepository::new();
        let ada = repo.insert_user(new_user("ada", "Ada")).await.unwrap();
        let bob = repo.insert_user(new_user("bob", "Bob")).await.unwrap();

        repo.insert_post(&ada, new_post("hello", Visibility::Public)).await.unwrap();
        repo.insert_post(&ada, new_post("friends", Visibility::Followers)).await.unwrap();
        repo.insert_post(&ada, new_post("secret", Visibility::Private)).await.unwrap();

        let anonymous_public = PostQuery::VisibleTo {
            viewer_id: None,
            following: vec![],
            visibility: Visibility::Public,
        };
        assert_eq!(repo.find_posts(&anonymous_public).await.unwrap().len(), 1);

        let bob_public = PostQuery::VisibleTo {
            viewer_id: Some(bob.id.clone()),
            following: vec![ada.id.clone()],
            visibility: Visibility::Public,
        };
        let contents: Vec<String> = repo
            .find_posts(&bob_public)
            .await
            .unwrap()
            .into_iter()
            .map(|post| post.content)
            .collect();
        assert_eq!(contents.len(), 2);
        assert!(contents.contains(&"friends".to_string()));

        let ada_public = PostQuery::VisibleTo {
            viewer_id: Some(ada.id.clone()),
            following: vec![],
            visibility: Visibility::Public,
        };
        assert_eq!(repo.find_posts(&ada_public).await.unwrap().len(), 3);

        let bob_followers = PostQuery::VisibleTo {
            viewer_id: Some(bob.id.clone()),
            following: vec![ada.id.clone()],
            visibility: Visibility::Followers,
        };
        assert_eq!(repo.find_posts(&bob_followers).await.unwrap().len(), 1);

        let bob_private = PostQuery::VisibleTo {
            viewer_id: Some(bob.id.clone()),
            following: vec![ada.id.clone()],
            visibility: Visibility::Private,
        };
        assert!(repo.find_posts(&bob_private).await.unwrap().is_empty());

        let ada_private = PostQuery::VisibleTo {
            viewer_id: Some(ada.id.clone()),
            following: vec![],
            visibility: Visibility::Private,
        };
        assert_eq!(repo.find_posts(&ada_private).await.unwrap()[0].content, "secret");
    }

    #[tokio::test]
    async fn test_populate_uses_current_owner() {
        let repo = MemoryRepository::new();
        let ada = repo.insert_user(new_user("ada", "Ada")).await.unwrap();
        let post = repo.insert_post(&ada, new_post("hi", Visibility::Public)).await.unwrap();

        let update = ProfileUpdate {
            name: Some("Ada L.".to_string()),
            ..ProfileUpdate::default()
        };
        repo.update_profile(&ada.id, &update).await.unwrap();

        let fetched = repo.find_post(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.owner.name, "Ada L.");
    }

    #[tokio::test]
    async fn test_search_excludes_requester_and_ignores_case() {
        let repo = MemoryRepository::new();
        let ada = repo.insert_user(new_user("ada", "Ada")).await.unwrap();
        repo.insert_user(new_user("adam", "Adam Smith")).await.unwrap();
        repo.insert_user(new_user("bob", "Bob")).await.unwrap();

        let found = repo.search_users("AD", &ada.id, 50).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "adam");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let repo = MemoryRepository::new();
        repo.insert_user(new_user("ada", "Ada")).await.unwrap();

        let result = repo.insert_user(new_user("ada", "Other")).await;
        assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let repo = MemoryRepository::new();
        repo.set_failing(true);

        assert!(matches!(
            repo.list_users().await,
            Err(ServiceError::Database(_))
        ));
        assert_eq!(repo.read_count(), 0);

        repo.set_failing(false);
        assert!(repo.list_users().await.is_ok());
        assert_eq!(repo.read_count(), 1);
    }

    #[tokio::test]
    async fn test_toggle_follow_updates_both_sides() {
        let repo = MemoryRepository::new();
        let ada = repo.insert_user(new_user("ada", "Ada")).await.unwrap();
        let bob = repo.insert_user(new_user("bob", "Bob")).await.unwrap();

        let outcome = repo.toggle_follow(&bob.id, &ada.id).await.unwrap().unwrap();
        assert_eq!(outcome, FollowOutcome { following: true, follower_count: 1 });

        let bob_now = repo.find_user(&bob.id).await.unwrap().unwrap();
        let ada_now = repo.find_user(&ada.id).await.unwrap().unwrap();
        assert_eq!(bob_now.following, vec![ada.id.clone()]);
        assert_eq!(ada_now.followers, vec![bob.id.clone()]);

        let outcome = repo.toggle_follow(&bob.id, &ada.id).await.unwrap().unwrap();
        assert_eq!(outcome, FollowOutcome { following: false, follower_count: 0 });
        assert!(repo.toggle_follow(&bob.id, "u404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_follow_leaves_both_users_untouched() {
        let repo = MemoryRepository::new();
        let ada = repo.insert_user(new_user("ada", "Ada")).await.unwrap();
        let bob = repo.insert_user(new_user("bob", "Bob")).await.unwrap();

        repo.set_failing(true);
        assert!(matches!(
            repo.toggle_follow(&bob.id, &ada.id).await,
            Err(ServiceError::Database(_))
        ));
        repo.set_failing(false);

        let bob_now = repo.find_user(&bob.id).await.unwrap().unwrap();
        let ada_now = repo.find_user(&ada.id).await.unwrap().unwrap();
        assert!(bob_now.following.is_empty());
        assert!(ada_now.followers.is_empty());
    }

    #[tokio::test]
    async fn test_comment_ids_stay_unique_after_removal() {
        let repo = MemoryRepository::new();
        let ada = repo.insert_user(new_user("ada", "Ada")).await.unwrap();
        let post = repo.insert_post(&ada, new_post("hi", Visibility::Public)).await.unwrap();

        let first = repo.push_comment(&post.id, &ada.id, "one").await.unwrap().unwrap();
        let second = repo.push_comment(&post.id, &ada.id, "two").await.unwrap().unwrap();
        assert!(repo.pull_comment(&post.id, &first.id).await.unwrap());
        assert!(!repo.pull_comment(&post.id, &first.id).await.unwrap());
        let third = repo.push_comment(&post.id, &ada.id, "three").await.unwrap().unwrap();

        assert_ne!(third.id, second.id);
        let stored = repo.find_post(&post.id).await.unwrap().unwrap();
        let ids: Vec<&str> = stored.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), third.id.as_str()]);
    }

    #[tokio::test]
    async fn test_toggles_on_missing_records() {
        let repo = MemoryRepository::new();
        let ada = repo.insert_user(new_user("ada", "Ada")).await.unwrap();

        assert!(repo.toggle_like("p404", &ada.id).await.unwrap().is_none());
        assert!(repo.toggle_bookmark(&ada.id, "p404").await.unwrap().is_none());
        assert!(repo.push_comment("p404", &ada.id, "x").await.unwrap().is_none());
        assert!(repo
            .update_post("p404", &PostUpdate::default())
            .await
            .unwrap()
            .is_none());
    }
}
