//! Post service
//!
//! Post lifecycle: create (text and/or image), owner-only edit and
//! delete, and like toggling.

use std::sync::Arc;

use crate::data::{Database, EntityId, Post, PostWithAuthor};
use crate::error::AppError;
use crate::storage::MediaStorage;

const MAX_POST_CHARS: usize = 2000;

/// Post service
pub struct PostService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    fn validate_content(content: &str) -> Result<(), AppError> {
        if content.chars().count() > MAX_POST_CHARS {
            return Err(AppError::Validation(
                "Post cannot exceed 2000 characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a new post
    ///
    /// # Arguments
    /// * `content` - Post text; may be empty when an image is attached
    /// * `image` - Optional (bytes, content type) from the multipart
    ///   upload; immutable after creation
    ///
    /// # Returns
    /// The created post joined with its author's public fields
    pub async fn create(
        &self,
        user_id: &str,
        content: Option<String>,
        image: Option<(Vec<u8>, String)>,
    ) -> Result<PostWithAuthor, AppError> {
        let content = content.unwrap_or_default().trim().to_string();
        if content.is_empty() && image.is_none() {
            return Err(AppError::Validation(
                "Post content or image is required".to_string(),
            ));
        }
        Self::validate_content(&content)?;

        let post_id = EntityId::new().0;

        let image_s3_key = match image {
            Some((data, content_type)) => {
                let (key, _url) = self
                    .storage
                    .upload_post_image(&post_id, data, &content_type)
                    .await?;
                crate::metrics::MEDIA_UPLOADS_TOTAL.inc();
                Some(key)
            }
            None => None,
        };

        let now = chrono::Utc::now();
        let post = Post {
            id: post_id,
            user_id: user_id.to_string(),
            content,
            image_s3_key,
            created_at: now,
            updated_at: now,
        };

        if let Err(error) = self.db.insert_post(&post).await {
            // The image is already in the bucket; drop it so a failed
            // insert does not leak storage.
            if let Some(key) = post.image_s3_key.as_deref() {
                if let Err(cleanup_error) = self.storage.delete(key).await {
                    tracing::warn!(
                        key = %key,
                        error = %cleanup_error,
                        "failed to rollback uploaded post image after database error"
                    );
                }
            }
            return Err(error);
        }

        crate::metrics::POSTS_CREATED_TOTAL.inc();

        self.db
            .get_post_with_author(&post.id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Update a post's text (owner only)
    ///
    /// The image is immutable after creation. Passing `None` leaves
    /// the text unchanged, mirroring a partial update with no fields.
    pub async fn update(
        &self,
        actor_id: &str,
        post_id: &str,
        content: Option<String>,
    ) -> Result<PostWithAuthor, AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        super::ensure_owner(&post.user_id, actor_id, "Not authorized to update this post")?;

        if let Some(content) = content {
            let content = content.trim().to_string();
            if content.is_empty() && post.image_s3_key.is_none() {
                return Err(AppError::Validation(
                    "Post content or image is required".to_string(),
                ));
            }
            Self::validate_content(&content)?;

            self.db
                .update_post_content(post_id, &content, chrono::Utc::now())
                .await?;
        }

        self.db
            .get_post_with_author(post_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Delete a post (owner only)
    ///
    /// Comments and likes cascade with the row; the attached image is
    /// removed from storage best-effort afterwards.
    pub async fn delete(&self, actor_id: &str, post_id: &str) -> Result<(), AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        super::ensure_owner(&post.user_id, actor_id, "Not authorized to delete this post")?;

        let deleted = self.db.delete_post(post_id).await?;
        if !deleted {
            return Err(AppError::NotFound);
        }

        if let Some(key) = post.image_s3_key.as_deref() {
            if let Err(error) = self.storage.delete(key).await {
                tracing::warn!(
                    key = %key,
                    error = %error,
                    "failed to delete image for removed post"
                );
            }
        }

        Ok(())
    }

    /// Toggle the acting account's membership in the post's like-set
    ///
    /// Each call flips the current state, so repeated calls alternate
    /// between liked and not liked.
    ///
    /// # Returns
    /// (`true` if the post is now liked, the full like-set after the
    /// toggle)
    pub async fn toggle_like(
        &self,
        actor_id: &str,
        post_id: &str,
    ) -> Result<(bool, Vec<String>), AppError> {
        if self.db.get_post(post_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let already_liked = self.db.has_post_like(post_id, actor_id).await?;
        if already_liked {
            self.db.delete_post_like(post_id, actor_id).await?;
        } else {
            self.db.insert_post_like(post_id, actor_id).await?;
        }

        let likes = self.db.post_like_user_ids(post_id).await?;
        Ok((!already_liked, likes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::User;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-post.db");
        let db = Database::connect(&db_path).await.unwrap();
        (Arc::new(db), temp_dir)
    }

    async fn create_test_storage() -> Arc<MediaStorage> {
        let media = crate::config::MediaStorageConfig {
            bucket: "test-media-bucket".to_string(),
            public_url: "https://media.test.example.com".to_string(),
        };
        let cloudflare = crate::config::CloudflareConfig {
            account_id: "test-account".to_string(),
            r2_access_key_id: "test-access-key".to_string(),
            r2_secret_access_key: "test-secret-key".to_string(),
        };

        Arc::new(MediaStorage::new(&media, &cloudflare).await.unwrap())
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

    async fn create_service() -> (PostService, Arc<Database>, TempDir) {
        let (db, temp_dir) = create_test_db().await;
        let storage = create_test_storage().await;
        (PostService::new(db.clone(), storage), db, temp_dir)
    }

    #[tokio::test]
    async fn create_requires_content_or_image() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = insert_user(&db, "alice").await;

        let error = service.create(&alice.id, None, None).await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));

        let error = service
            .create(&alice.id, Some("   ".to_string()), None)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));

        let post = service
            .create(&alice.id, Some("hello".to_string()), None)
            .await
            .unwrap();
        assert_eq!(post.content, "hello");
        assert_eq!(post.author_username, "alice");
    }

    #[tokio::test]
    async fn create_rejects_oversized_content() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = insert_user(&db, "alice").await;

        let oversized = "x".repeat(2001);
        let error = service
            .create(&alice.id, Some(oversized), None)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            AppError::Validation(message) if message.contains("2000")
        ));
    }

    #[tokio::test]
    async fn update_enforces_ownership() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;

        let post = service
            .create(&alice.id, Some("original".to_string()), None)
            .await
            .unwrap();

        // Absent resource is 404
        let error = service
            .update(&alice.id, "missing", Some("x".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::NotFound));

        // Present but not owned is 403
        let error = service
            .update(&bob.id, &post.id, Some("hijack".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Forbidden(_)));

        let updated = service
            .update(&alice.id, &post.id, Some("edited".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");
    }

    #[tokio::test]
    async fn delete_enforces_ownership() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;

        let post = service
            .create(&alice.id, Some("mine".to_string()), None)
            .await
            .unwrap();

        let error = service.delete(&bob.id, &post.id).await.unwrap_err();
        assert!(matches!(error, AppError::Forbidden(_)));

        service.delete(&alice.id, &post.id).await.unwrap();
        assert!(db.get_post(&post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn like_toggle_alternates_membership() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = insert_user(&db, "alice").await;
        let bob = insert_user(&db, "bob").await;

        let post = service
            .create(&alice.id, Some("like me".to_string()), None)
            .await
            .unwrap();

        let (liked, likes) = service.toggle_like(&bob.id, &post.id).await.unwrap();
        assert!(liked);
        assert_eq!(likes, vec![bob.id.clone()]);

        // Liking twice returns the account to "not liked".
        let (liked, likes) = service.toggle_like(&bob.id, &post.id).await.unwrap();
        assert!(!liked);
        assert!(likes.is_empty());

        let (liked, _) = service.toggle_like(&bob.id, &post.id).await.unwrap();
        assert!(liked);
    }

    #[tokio::test]
    async fn like_toggle_on_missing_post_is_not_found() {
        let (service, db, _temp_dir) = create_service().await;
        let bob = insert_user(&db, "bob").await;

        let error = service.toggle_like(&bob.id, "missing").await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }
}
