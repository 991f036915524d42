//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx for parameterized queries against a shared pool.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

const POST_WITH_AUTHOR_SELECT: &str = "SELECT p.id, p.user_id, p.content, p.image_s3_key, \
     p.created_at, p.updated_at, \
     u.username AS author_username, \
     u.display_name AS author_display_name, \
     u.avatar_s3_key AS author_avatar_s3_key \
     FROM posts p JOIN users u ON u.id = p.user_id";

const COMMENT_WITH_AUTHOR_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, c.content, \
     c.created_at, c.updated_at, \
     u.username AS author_username, \
     u.display_name AS author_display_name, \
     u.avatar_s3_key AS author_avatar_s3_key \
     FROM comments c JOIN users u ON u.id = c.user_id";

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        // Create connection string
        let connection_string = format!("sqlite:{}?mode=rwc", path.display());

        // Create connection pool
        let pool = SqlitePool::connect(&connection_string).await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    ///
    /// # Errors
    /// Maps unique constraint violations (username/email taken) to a
    /// validation error with a client-facing message.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, display_name, bio,
                avatar_s3_key, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.avatar_s3_key)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Validation("Username or email already in use".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(())
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive)
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by username (case-insensitive)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? COLLATE NOCASE")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Patch user profile fields by user ID.
    ///
    /// Pass `None` for omitted fields (no change).
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching user row exists.
    pub async fn patch_user_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = match (display_name, bio) {
            (Some(display_name), Some(bio)) => {
                sqlx::query("UPDATE users SET display_name = ?, bio = ? WHERE id = ?")
                    .bind(display_name)
                    .bind(bio)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            (Some(display_name), None) => {
                sqlx::query("UPDATE users SET display_name = ? WHERE id = ?")
                    .bind(display_name)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            (None, Some(bio)) => {
                sqlx::query("UPDATE users SET bio = ? WHERE id = ?")
                    .bind(bio)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
            // Treat a no-op patch as success.
            (None, None) => return Ok(true),
        };

        Ok(result.rows_affected() == 1)
    }

    /// Update user avatar key by user ID.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching user row exists.
    pub async fn update_user_avatar_key(
        &self,
        user_id: &str,
        avatar_s3_key: Option<&str>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET avatar_s3_key = ? WHERE id = ?")
            .bind(avatar_s3_key)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a user by ID.
    ///
    /// Follow edges on both sides, owned posts and comments, and all
    /// likes go with the row through `ON DELETE CASCADE`, atomically.
    ///
    /// # Returns
    /// `true` if deleted, `false` if no matching user row exists.
    pub async fn delete_user(&self, user_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Search users by substring on username or display name
    /// (case-insensitive), ordered by username.
    pub async fn search_users(&self, query: &str, limit: usize) -> Result<Vec<User>, AppError> {
        let pattern = format!("%{}%", query);
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE username LIKE ? OR display_name LIKE ?
            ORDER BY username
            LIMIT ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Insert a follow edge unless the pair already exists.
    ///
    /// # Returns
    /// `true` if inserted, `false` if the edge was already present.
    pub async fn insert_follow(&self, follow: &Follow) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (id, follower_id, following_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(&follow.id)
        .bind(&follow.follower_id)
        .bind(&follow.following_id)
        .bind(follow.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a follow edge.
    ///
    /// # Returns
    /// `true` if deleted, `false` if the edge did not exist.
    pub async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
                .bind(follower_id)
                .bind(following_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Check whether a follow edge exists
    pub async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists > 0)
    }

    /// List accounts following `user_id`, newest edge first,
    /// each resolved to the follower's public fields.
    pub async fn list_followers(&self, user_id: &str) -> Result<Vec<FollowEdgeProfile>, AppError> {
        let edges = sqlx::query_as::<_, FollowEdgeProfile>(
            r#"
            SELECT f.id, f.created_at, u.id AS user_id, u.username,
                   u.display_name, u.avatar_s3_key
            FROM follows f JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    /// List accounts `user_id` follows, newest edge first,
    /// each resolved to the followee's public fields.
    pub async fn list_following(&self, user_id: &str) -> Result<Vec<FollowEdgeProfile>, AppError> {
        let edges = sqlx::query_as::<_, FollowEdgeProfile>(
            r#"
            SELECT f.id, f.created_at, u.id AS user_id, u.username,
                   u.display_name, u.avatar_s3_key
            FROM follows f JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    /// Get the IDs of all accounts `user_id` follows
    pub async fn following_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT following_id FROM follows WHERE follower_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Count accounts following `user_id`
    pub async fn count_followers(&self, user_id: &str) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE following_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Count accounts `user_id` follows
    pub async fn count_following(&self, user_id: &str) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, content, image_s3_key, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.user_id)
        .bind(&post.content)
        .bind(&post.image_s3_key)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Get a post by ID joined with its author's public fields
    pub async fn get_post_with_author(
        &self,
        id: &str,
    ) -> Result<Option<PostWithAuthor>, AppError> {
        let post = sqlx::query_as::<_, PostWithAuthor>(&format!(
            "{} WHERE p.id = ?",
            POST_WITH_AUTHOR_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    /// Update a post's text content.
    ///
    /// The image is immutable after creation, so only `content` and
    /// `updated_at` change here.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching post row exists.
    pub async fn update_post_content(
        &self,
        post_id: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE posts SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(updated_at)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a post by ID.
    ///
    /// Comments and likes on it cascade.
    ///
    /// # Returns
    /// `true` if deleted, `false` if no matching post row exists.
    pub async fn delete_post(&self, post_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count all posts
    pub async fn count_posts(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// List posts newest-first with author fields, paginated
    ///
    /// # Arguments
    /// * `limit` - Page size
    /// * `offset` - Rows to skip
    pub async fn list_posts(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostWithAuthor>, AppError> {
        let posts = sqlx::query_as::<_, PostWithAuthor>(&format!(
            "{} ORDER BY p.created_at DESC LIMIT ? OFFSET ?",
            POST_WITH_AUTHOR_SELECT
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// List all posts by one account, newest-first, with author fields
    pub async fn list_posts_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PostWithAuthor>, AppError> {
        let posts = sqlx::query_as::<_, PostWithAuthor>(&format!(
            "{} WHERE p.user_id = ? ORDER BY p.created_at DESC",
            POST_WITH_AUTHOR_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Count posts authored by any of `author_ids`.
    ///
    /// Callers must pass a non-empty slice.
    pub async fn count_posts_by_authors(&self, author_ids: &[String]) -> Result<i64, AppError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM posts WHERE user_id IN (");
        let mut separated = builder.separated(", ");
        for id in author_ids {
            separated.push_bind(id);
        }
        builder.push(")");

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// List posts authored by any of `author_ids`, newest-first,
    /// with author fields, paginated.
    ///
    /// Callers must pass a non-empty slice.
    pub async fn list_posts_by_authors(
        &self,
        author_ids: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostWithAuthor>, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new(POST_WITH_AUTHOR_SELECT);
        builder.push(" WHERE p.user_id IN (");
        let mut separated = builder.separated(", ");
        for id in author_ids {
            separated.push_bind(id);
        }
        builder.push(") ORDER BY p.created_at DESC LIMIT ");
        builder.push_bind(limit as i64);
        builder.push(" OFFSET ");
        builder.push_bind(offset as i64);

        let posts = builder
            .build_query_as::<PostWithAuthor>()
            .fetch_all(&self.pool)
            .await?;

        Ok(posts)
    }

    // =========================================================================
    // Post likes
    // =========================================================================

    /// Check whether `user_id` currently likes the post
    pub async fn has_post_like(&self, post_id: &str, user_id: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM post_likes WHERE post_id = ? AND user_id = ?",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists > 0)
    }

    /// Add `user_id` to the post's like-set
    pub async fn insert_post_like(&self, post_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove `user_id` from the post's like-set
    pub async fn delete_post_like(&self, post_id: &str, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get the IDs of all accounts liking the post, oldest like first
    pub async fn post_like_user_ids(&self, post_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM post_likes WHERE post_id = ? ORDER BY created_at",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Insert a new comment
    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, user_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.user_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a comment by ID
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Get a comment by ID joined with its author's public fields
    pub async fn get_comment_with_author(
        &self,
        id: &str,
    ) -> Result<Option<CommentWithAuthor>, AppError> {
        let comment = sqlx::query_as::<_, CommentWithAuthor>(&format!(
            "{} WHERE c.id = ?",
            COMMENT_WITH_AUTHOR_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(comment)
    }

    /// Update a comment's text content.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching comment row exists.
    pub async fn update_comment_content(
        &self,
        comment_id: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(updated_at)
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a comment by ID.
    ///
    /// The parent post's comment list is a derived view over `post_id`,
    /// so this single statement is the whole deletion.
    ///
    /// # Returns
    /// `true` if deleted, `false` if no matching comment row exists.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = ?")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List all comments on a post, newest-first, with author fields
    pub async fn list_comments_for_post(
        &self,
        post_id: &str,
    ) -> Result<Vec<CommentWithAuthor>, AppError> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(&format!(
            "{} WHERE c.post_id = ? ORDER BY c.created_at DESC",
            COMMENT_WITH_AUTHOR_SELECT
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// List the most recent comments on a post, with author fields
    ///
    /// # Arguments
    /// * `limit` - Maximum comments returned (feed previews use 3)
    pub async fn recent_comments_for_post(
        &self,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<CommentWithAuthor>, AppError> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(&format!(
            "{} WHERE c.post_id = ? ORDER BY c.created_at DESC LIMIT ?",
            COMMENT_WITH_AUTHOR_SELECT
        ))
        .bind(post_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    /// Count comments on a post
    pub async fn count_comments_for_post(&self, post_id: &str) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_id = ?")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    // =========================================================================
    // Comment likes
    // =========================================================================

    /// Check whether `user_id` currently likes the comment
    pub async fn has_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ? AND user_id = ?",
        )
        .bind(comment_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists > 0)
    }

    /// Add `user_id` to the comment's like-set
    pub async fn insert_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO comment_likes (comment_id, user_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (comment_id, user_id) DO NOTHING
            "#,
        )
        .bind(comment_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove `user_id` from the comment's like-set
    pub async fn delete_comment_like(
        &self,
        comment_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM comment_likes WHERE comment_id = ? AND user_id = ?")
            .bind(comment_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get the IDs of all accounts liking the comment, oldest like first
    pub async fn comment_like_user_ids(&self, comment_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM comment_likes WHERE comment_id = ? ORDER BY created_at",
        )
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}
