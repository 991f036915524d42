//! Comment service
//!
//! Comment lifecycle on posts: create, owner-only edit and delete,
//! listing, and like toggling.

use std::sync::Arc;

use crate::data::{Comment, CommentWithAuthor, Database, EntityId};
use crate::error::AppError;

const MAX_COMMENT_CHARS: usize = 500;

/// A comment with its author fields and like-set, ready for projection.
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: CommentWithAuthor,
    pub likes: Vec<String>,
}

/// Comment service
pub struct CommentService {
    db: Arc<Database>,
}

impl CommentService {
    /// Create new comment service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn validate_content(content: &str) -> Result<String, AppError> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(AppError::Validation(
                "Comment content is required".to_string(),
            ));
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(AppError::Validation(
                "Comment cannot exceed 500 characters".to_string(),
            ));
        }
        Ok(content)
    }

    async fn view(&self, comment_id: &str) -> Result<CommentView, AppError> {
        let comment = self
            .db
            .get_comment_with_author(comment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let likes = self.db.comment_like_user_ids(comment_id).await?;
        Ok(CommentView { comment, likes })
    }

    /// Create a comment on a post
    ///
    /// # Errors
    /// * `NotFound` if the parent post does not exist
    /// * Validation error for empty or oversized content
    pub async fn create(
        &self,
        actor_id: &str,
        post_id: &str,
        content: &str,
    ) -> Result<CommentView, AppError> {
        let content = Self::validate_content(content)?;

        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let now = chrono::Utc::now();
        let comment = Comment {
            id: EntityId::new().0,
            post_id: post_id.to_string(),
            user_id: actor_id.to_string(),
            content,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_comment(&comment).await?;
        crate::metrics::COMMENTS_CREATED_TOTAL.inc();

        self.view(&comment.id).await
    }

    /// List all comments on a post, newest first, with like-sets
    pub async fn list_for_post(&self, post_id: &str) -> Result<Vec<CommentView>, AppError> {
        let comments = self.db.list_comments_for_post(post_id).await?;

        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let likes = self.db.comment_like_user_ids(&comment.id).await?;
            views.push(CommentView { comment, likes });
        }

        Ok(views)
    }

    /// Update a comment's text (owner only)
    pub async fn update(
        &self,
        actor_id: &str,
        comment_id: &str,
        content: &str,
    ) -> Result<CommentView, AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        super::ensure_owner(
            &comment.user_id,
            actor_id,
            "Not authorized to update this comment",
        )?;

        let content = Self::validate_content(content)?;
        self.db
            .update_comment_content(comment_id, &content, chrono::Utc::now())
            .await?;

        self.view(comment_id).await
    }

    /// Delete a comment (owner only)
    ///
    /// One statement: the parent post's comment list is derived from
    /// `post_id`, so there is no reference to detach.
    pub async fn delete(&self, actor_id: &str, comment_id: &str) -> Result<(), AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(AppError::NotFound)?;
        super::ensure_owner(
            &comment.user_id,
            actor_id,
            "Not authorized to delete this comment",
        )?;

        let deleted = self.db.delete_comment(comment_id).await?;
        if !deleted {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    /// Toggle the acting account's membership in the comment's like-set
    ///
    /// # Returns
    /// (`true` if the comment is now liked, the full like-set after
    /// the toggle)
    pub async fn toggle_like(
        &self,
        actor_id: &str,
        comment_id: &str,
    ) -> Result<(bool, Vec<String>), AppError> {
        if self.db.get_comment(comment_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let already_liked = self.db.has_comment_like(comment_id, actor_id).await?;
        if already_liked {
            self.db.delete_comment_like(comment_id, actor_id).await?;
        } else {
            self.db.insert_comment_like(comment_id, actor_id).await?;
        }

        let likes = self.db.comment_like_user_ids(comment_id).await?;
        Ok((!already_liked, likes))
    }
}
