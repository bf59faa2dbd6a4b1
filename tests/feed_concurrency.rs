//! Concurrent feed mutations
//!
//! The repository below yields before every call, the way a networked
//! database would, so spawned mutations interleave on the runtime.

use std::sync::Arc;

use async_trait::async_trait;
use feed_cache::cache::{keys, ManualClock};
use feed_cache::feed::PostQuery;
use feed_cache::models::{
    BookmarkOutcome, Comment, FollowOutcome, LikeOutcome, NewPost, NewUser, Post, PostUpdate,
    ProfileUpdate, UserProfile, UserSummary, Visibility,
};
use feed_cache::{Config, FeedService, MemoryRepository, Repository, ResponseCache, Result};
use tokio::task::yield_now;

#[derive(Debug, Default)]
struct YieldingRepository {
    inner: MemoryRepository,
}

#[async_trait]
impl Repository for YieldingRepository {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        yield_now().await;
        self.inner.find_user(user_id).await
    }

    async fn list_users(&self) -> Result<Vec<UserSummary>> {
        yield_now().await;
        self.inner.list_users().await
    }

    async fn search_users(
        &self,
        term: &str,
        exclude_id: &str,
        limit: usize,
    ) -> Result<Vec<UserSummary>> {
        yield_now().await;
        self.inner.search_users(term, exclude_id, limit).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserProfile> {
        yield_now().await;
        self.inner.insert_user(user).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserProfile>> {
        yield_now().await;
        self.inner.update_profile(user_id, update).await
    }

    async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<Option<FollowOutcome>> {
        yield_now().await;
        self.inner.toggle_follow(follower_id, followee_id).await
    }

    async fn toggle_bookmark(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<BookmarkOutcome>> {
        yield_now().await;
        self.inner.toggle_bookmark(user_id, post_id).await
    }

    async fn find_post(&self, post_id: &str) -> Result<Option<Post>> {
        yield_now().await;
        self.inner.find_post(post_id).await
    }

    async fn find_posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        yield_now().await;
        self.inner.find_posts(query).await
    }

    async fn insert_post(&self, owner: &UserProfile, post: NewPost) -> Result<Post> {
        yield_now().await;
        self.inner.insert_post(owner, post).await
    }

    async fn update_post(&self, post_id: &str, update: &PostUpdate) -> Result<Option<Post>> {
        yield_now().await;
        self.inner.update_post(post_id, update).await
    }

    async fn delete_post(&self, post_id: &str) -> Result<bool> {
        yield_now().await;
        self.inner.delete_post(post_id).await
    }

    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<Option<LikeOutcome>> {
        yield_now().await;
        self.inner.toggle_like(post_id, user_id).await
    }

    async fn push_comment(
        &self,
        post_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<Option<Comment>> {
        yield_now().await;
        self.inner.push_comment(post_id, user_id, text).await
    }

    async fn pull_comment(&self, post_id: &str, comment_id: &str) -> Result<bool> {
        yield_now().await;
        self.inner.pull_comment(post_id, comment_id).await
    }
}

type Service = FeedService<YieldingRepository>;

fn service() -> Arc<Service> {
    let config = Config::default();
    let cache = ResponseCache::with_clock(
        config.max_entries,
        config.default_ttl,
        Arc::new(ManualClock::new(0)),
    );
    Arc::new(FeedService::new(
        cache,
        Arc::new(YieldingRepository::default()),
        &config,
    ))
}

async fn register(service: &Service, username: &str) -> UserProfile {
    service
        .register_user(NewUser {
            username: username.to_string(),
            name: username.to_uppercase(),
        })
        .await
        .unwrap()
}

async fn register_many(service: &Service, count: usize) -> Vec<UserProfile> {
    let mut users = Vec::with_capacity(count);
    for i in 0..count {
        users.push(register(service, &format!("fan{}", i)).await);
    }
    users
}

async fn author_with_post(service: &Service) -> (UserProfile, String) {
    let author = register(service, "ada").await;
    let post = service
        .create_post(
            &author.id,
            NewPost {
                content: "hello".to_string(),
                tags: vec![],
                visibility: Visibility::Public,
            },
        )
        .await
        .unwrap();
    (author, post.id)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_are_all_kept() {
    let service = service();
    let (_, post_id) = author_with_post(&service).await;
    let fans = register_many(&service, 10).await;

    let tasks: Vec<_> = fans
        .iter()
        .map(|fan| {
            let service = Arc::clone(&service);
            let fan_id = fan.id.clone();
            let post_id = post_id.clone();
            tokio::spawn(async move { service.toggle_like(&fan_id, &post_id).await })
        })
        .collect();

    let mut counts = Vec::new();
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        assert!(outcome.liked);
        counts.push(outcome.like_count);
    }
    counts.sort_unstable();
    assert_eq!(counts, (1..=10).collect::<Vec<_>>());

    let view = service.single_post(&post_id).await.unwrap();
    assert!(!view.from_cache);
    assert_eq!(view.data.likes.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_likes_comments_and_follows() {
    let service = service();
    let (author, post_id) = author_with_post(&service).await;
    let fans = register_many(&service, 8).await;

    let tasks: Vec<_> = fans
        .iter()
        .map(|fan| {
            let service = Arc::clone(&service);
            let fan_id = fan.id.clone();
            let author_id = author.id.clone();
            let post_id = post_id.clone();
            tokio::spawn(async move {
                service.toggle_like(&fan_id, &post_id).await?;
                service
                    .add_comment(&fan_id, &post_id, &format!("from {}", fan_id))
                    .await?;
                service.toggle_follow(&fan_id, &author_id).await?;
                service.toggle_bookmark(&fan_id, &post_id).await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().unwrap().bookmarked);
    }

    let post = service.single_post(&post_id).await.unwrap().data;
    assert_eq!(post.likes.len(), 8);
    assert_eq!(post.comments.len(), 8);
    let mut comment_ids: Vec<&str> = post.comments.iter().map(|c| c.id.as_str()).collect();
    comment_ids.sort_unstable();
    comment_ids.dedup();
    assert_eq!(comment_ids.len(), 8);

    let author_now = service.user_profile(&author.id).await.unwrap().data;
    assert_eq!(author_now.followers.len(), 8);
    for fan in &fans {
        assert!(author_now.followers.contains(&fan.id));
        let fan_now = service.user_profile(&fan.id).await.unwrap().data;
        assert_eq!(fan_now.following, vec![author.id.clone()]);
        assert_eq!(fan_now.bookmarks, vec![post_id.clone()]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_follow_and_unfollow_race_keeps_both_sides_in_step() {
    let service = service();
    let author = register(&service, "ada").await;
    let fans = register_many(&service, 6).await;

    // Every fan toggles three times: ends following
    let tasks: Vec<_> = fans
        .iter()
        .map(|fan| {
            let service = Arc::clone(&service);
            let fan_id = fan.id.clone();
            let author_id = author.id.clone();
            tokio::spawn(async move {
                for _ in 0..3 {
                    service.toggle_follow(&fan_id, &author_id).await?;
                }
                Ok::<_, feed_cache::ServiceError>(())
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    service.cache().flush();
    let author_now = service.user_profile(&author.id).await.unwrap().data;
    assert_eq!(author_now.followers.len(), fans.len());
    for fan in &fans {
        let fan_now = service.user_profile(&fan.id).await.unwrap().data;
        assert!(fan_now.follows(&author.id));
    }
    assert!(service
        .cache()
        .inspect(&keys::user_profile(&author.id))
        .is_some());
}
