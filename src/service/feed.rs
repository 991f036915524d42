//! Feed assembler
//!
//! Builds the global and following feeds (paginated) and per-account
//! post listings. Ordering is newest-first on creation timestamp;
//! each post is hydrated with its author, like-set, comment count,
//! and a short preview of recent comments.

use std::sync::Arc;

use crate::data::{Database, PostWithAuthor};
use crate::error::AppError;
use crate::service::CommentView;

/// A post hydrated for feed projection.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: PostWithAuthor,
    /// IDs of accounts currently liking the post
    pub likes: Vec<String>,
    /// Total comments on the post
    pub comment_count: i64,
    /// Up to `comment_preview_count` most-recent comments
    pub recent_comments: Vec<CommentView>,
}

/// One page of a feed.
#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub current_page: usize,
    /// `ceil(total_posts / limit)`; 0 when the feed is empty
    pub total_pages: usize,
    pub total_posts: i64,
}

/// Feed assembler service
pub struct FeedService {
    db: Arc<Database>,
    comment_preview_count: usize,
}

impl FeedService {
    /// Create new feed service
    ///
    /// # Arguments
    /// * `comment_preview_count` - Recent comments embedded per post
    pub fn new(db: Arc<Database>, comment_preview_count: usize) -> Self {
        Self {
            db,
            comment_preview_count,
        }
    }

    /// Global feed: all posts, newest-first, paginated
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `limit` - Page size
    pub async fn global(&self, page: usize, limit: usize) -> Result<FeedPage, AppError> {
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let total_posts = self.db.count_posts().await?;
        let rows = self.db.list_posts(limit, offset).await?;
        let posts = self.hydrate_all(rows).await?;

        Ok(FeedPage {
            posts,
            current_page: page,
            total_pages: total_pages(total_posts, limit),
            total_posts,
        })
    }

    /// Following feed: posts authored by accounts the viewer follows,
    /// newest-first, paginated like the global feed
    pub async fn following(
        &self,
        viewer_id: &str,
        page: usize,
        limit: usize,
    ) -> Result<FeedPage, AppError> {
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let author_ids = self.db.following_ids(viewer_id).await?;
        if author_ids.is_empty() {
            return Ok(FeedPage {
                posts: Vec::new(),
                current_page: page,
                total_pages: 0,
                total_posts: 0,
            });
        }

        let total_posts = self.db.count_posts_by_authors(&author_ids).await?;
        let rows = self
            .db
            .list_posts_by_authors(&author_ids, limit, offset)
            .await?;
        let posts = self.hydrate_all(rows).await?;

        Ok(FeedPage {
            posts,
            current_page: page,
            total_pages: total_pages(total_posts, limit),
            total_posts,
        })
    }

    /// All posts by one account, newest-first
    pub async fn by_user(&self, user_id: &str) -> Result<Vec<PostView>, AppError> {
        let rows = self.db.list_posts_by_user(user_id).await?;
        self.hydrate_all(rows).await
    }

    /// Hydrate one post row into a `PostView`
    pub async fn hydrate(&self, row: PostWithAuthor) -> Result<PostView, AppError> {
        let likes = self.db.post_like_user_ids(&row.id).await?;
        let comment_count = self.db.count_comments_for_post(&row.id).await?;

        let recent = self
            .db
            .recent_comments_for_post(&row.id, self.comment_preview_count)
            .await?;
        let mut recent_comments = Vec::with_capacity(recent.len());
        for comment in recent {
            let likes = self.db.comment_like_user_ids(&comment.id).await?;
            recent_comments.push(CommentView { comment, likes });
        }

        Ok(PostView {
            post: row,
            likes,
            comment_count,
            recent_comments,
        })
    }

    async fn hydrate_all(&self, rows: Vec<PostWithAuthor>) -> Result<Vec<PostView>, AppError> {
        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            views.push(self.hydrate(row).await?);
        }
        Ok(views)
    }
}

fn total_pages(total: i64, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    ((total as usize) + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{EntityId, Follow, Post, User};
    use chrono::Utc;
    use tempfile::TempDir;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-feed.db");
        let db = Database::connect(&db_path).await.unwrap();
        (Arc::new(db), temp_dir)
    }

    async fn insert_user(db: &Database, username: &str) -> User {
        let user = User {
            id: EntityId::new().0,
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            display_name: None,
            bio: None,
            avatar_s3_key: None,
            created_at: Utc::now(),
        };
        db.insert_user(&user).await.unwrap();
        user
    }

    async fn insert_post_at(db: &Database, user: &User, content: &str, offset_secs: i64) -> Post {
        let at = Utc::now() + chrono::Duration::seconds(offset_secs);
        let post = Post {
            id: EntityId::new().0,
            user_id: user.id.clone(),
            content: content.to_string(),
            image_s3_key: None,
            created_at: at,
            updated_at: at,
        };
        db.insert_post(&post).await.unwrap();
        post
    }

    async fn follow(db: &Database, follower: &User, target: &User) {
        let edge = Follow {
            id: EntityId::new().0,
            follower_id: follower.id.clone(),
            following_id: target.id.clone(),
            created_at: Utc::now(),
        };
        db.insert_follow(&edge).await.unwrap();
    }

    #[test]
    fn total_pages_is_ceiling_division() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[tokio::test]
    async fn global_feed_paginates_newest_first() {
        let (db, _temp_dir) = create_test_db().await;
        let service = FeedService::new(db.clone(), 3);

        let alice = insert_user(&db, "alice").await;
        for i in 0..7 {
            insert_post_at(&db, &alice, &format!("post {}", i), i).await;
        }

        let page1 = service.global(1, 3).await.unwrap();
        assert_eq!(page1.total_posts, 7);
        assert_eq!(page1.total_pages, 3);
        assert_eq!(page1.current_page, 1);
        assert_eq!(page1.posts.len(), 3);
        assert_eq!(page1.posts[0].post.content, "post 6");

        let page3 = service.global(3, 3).await.unwrap();
        assert_eq!(page3.posts.len(), 1);
        assert_eq!(page3.posts[0].post.content, "post 0");

        // Past the end: empty slice, totals unchanged.
        let page4 = service.global(4, 3).await.unwrap();
        assert!(page4.posts.is_empty());
        assert_eq!(page4.total_pages, 3);
    }

    #[tokio::test]
    async fn global_feed_embeds_recent_comment_preview() {
        let (db, _temp_dir) = create_test_db().await;
        let service = FeedService::new(db.clone(), 3);

        let alice = insert_user(&db, "alice").await;
        let post = insert_post_at(&db, &alice, "busy", 0).await;

        for i in 0..5 {
            let at = Utc::now() + chrono::Duration::seconds(i);
            let comment = crate::data::Comment {
                id: EntityId::new().0,
                post_id: post.id.clone(),
                user_id: alice.id.clone(),
                content: format!("comment {}", i),
                created_at: at,
                updated_at: at,
            };
            db.insert_comment(&comment).await.unwrap();
        }

        let page = service.global(1, 10).await.unwrap();
        assert_eq!(page.posts.len(), 1);
        let view = &page.posts[0];
        assert_eq!(view.comment_count, 5);
        assert_eq!(view.recent_comments.len(), 3);
        assert_eq!(view.recent_comments[0].comment.content, "comment 4");
    }

    #[tokio::test]
    async fn following_feed_restricts_to_followed_authors() {
        let (db, _temp_dir) = create_test_db().await;
        let service = FeedService::new(db.clone(), 3);

        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        let carol = insert_user(&db, "carol").await;

        insert_post_at(&db, &alice, "from alice", 0).await;
        insert_post_at(&db, &carol, "from carol", 1).await;

        follow(&db, &bob, &alice).await;

        let feed = service.following(&bob.id, 1, 10).await.unwrap();
        assert_eq!(feed.total_posts, 1);
        assert_eq!(feed.posts.len(), 1);
        assert_eq!(feed.posts[0].post.content, "from alice");

        // No follows at all: empty page, zero totals.
        let empty = service.following(&carol.id, 1, 10).await.unwrap();
        assert!(empty.posts.is_empty());
        assert_eq!(empty.total_posts, 0);
        assert_eq!(empty.total_pages, 0);
    }

    #[tokio::test]
    async fn deleted_post_leaves_following_feed() {
        let (db, _temp_dir) = create_test_db().await;
        let service = FeedService::new(db.clone(), 3);

        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;
        follow(&db, &bob, &alice).await;

        let post = insert_post_at(&db, &alice, "hello", 0).await;

        let feed = service.following(&bob.id, 1, 10).await.unwrap();
        assert_eq!(feed.posts.len(), 1);

        db.delete_post(&post.id).await.unwrap();

        let feed = service.following(&bob.id, 1, 10).await.unwrap();
        assert!(feed.posts.is_empty());
        assert_eq!(feed.total_posts, 0);
    }
}
