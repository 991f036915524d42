//! Account service
//!
//! Registration, login, profile management, account deletion, and
//! account search.

use std::sync::Arc;

use crate::auth::password;
use crate::data::{Database, EntityId, User};
use crate::error::AppError;
use crate::storage::MediaStorage;

const MIN_USERNAME_CHARS: usize = 3;
const MAX_USERNAME_CHARS: usize = 30;
const MIN_PASSWORD_CHARS: usize = 6;
const MAX_DISPLAY_NAME_CHARS: usize = 50;
const MAX_BIO_CHARS: usize = 500;
const SEARCH_RESULT_LIMIT: usize = 10;

/// Minimal shape check, same as the original's `\S+@\S+\.\S+`.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn normalize_optional_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, storage: Arc<MediaStorage>) -> Self {
        Self { db, storage }
    }

    /// Get an account by ID
    pub async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)
    }

    /// Register a new account
    ///
    /// # Arguments
    /// * `username` - Unique handle, 3-30 characters
    /// * `email` - Unique email address (stored lowercased)
    /// * `password` - At least 6 characters, stored as an Argon2 hash
    /// * `display_name` - Optional display name, at most 50 characters
    ///
    /// # Errors
    /// Validation error for malformed fields or a taken username/email
    pub async fn register(
        &self,
        username: String,
        email: String,
        password: String,
        display_name: Option<String>,
    ) -> Result<User, AppError> {
        let username = username.trim().to_string();
        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(AppError::Validation(
                "Username must be at least 3 characters".to_string(),
            ));
        }
        if username.chars().count() > MAX_USERNAME_CHARS {
            return Err(AppError::Validation(
                "Username cannot exceed 30 characters".to_string(),
            ));
        }

        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::Validation(
                "Please enter a valid email".to_string(),
            ));
        }

        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let display_name = display_name.and_then(normalize_optional_text);
        if let Some(name) = display_name.as_deref() {
            if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
                return Err(AppError::Validation(
                    "Display name cannot exceed 50 characters".to_string(),
                ));
            }
        }

        // Fast-path checks give specific messages; the unique indexes
        // still catch concurrent registrations.
        if self.db.get_user_by_username(&username).await?.is_some() {
            return Err(AppError::Validation("Username already taken".to_string()));
        }
        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::Validation(
                "Email already registered".to_string(),
            ));
        }

        // Argon2 is deliberately slow; keep it off the async workers.
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let user = User {
            id: EntityId::new().0,
            username,
            email,
            password_hash,
            display_name,
            bio: None,
            avatar_s3_key: None,
            created_at: chrono::Utc::now(),
        };

        self.db.insert_user(&user).await?;
        crate::metrics::USERS_REGISTERED_TOTAL.inc();

        tracing::info!(username = %user.username, "Account registered");

        Ok(user)
    }

    /// Authenticate an account by email and password
    ///
    /// # Errors
    /// Validation error with a single message for both unknown email
    /// and wrong password, so callers cannot tell which failed
    pub async fn login(&self, email: String, password: String) -> Result<User, AppError> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.db.get_user_by_email(&email).await? else {
            return Err(AppError::Validation("Invalid credentials".to_string()));
        };

        let stored_hash = user.password_hash.clone();
        let matches =
            tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(e.into()))??;

        if !matches {
            return Err(AppError::Validation("Invalid credentials".to_string()));
        }

        Ok(user)
    }

    /// Get an account with its follower/following counts
    pub async fn profile(&self, user_id: &str) -> Result<(User, i64, i64), AppError> {
        let user = self.get_user(user_id).await?;
        let followers = self.db.count_followers(user_id).await?;
        let following = self.db.count_following(user_id).await?;
        Ok((user, followers, following))
    }

    /// Update profile fields
    ///
    /// Only display name and bio can change through this path.
    pub async fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<String>,
        bio: Option<String>,
    ) -> Result<User, AppError> {
        if let Some(name) = display_name.as_deref() {
            if name.trim().chars().count() > MAX_DISPLAY_NAME_CHARS {
                return Err(AppError::Validation(
                    "Display name cannot exceed 50 characters".to_string(),
                ));
            }
        }
        if let Some(bio) = bio.as_deref() {
            if bio.trim().chars().count() > MAX_BIO_CHARS {
                return Err(AppError::Validation(
                    "Bio cannot exceed 500 characters".to_string(),
                ));
            }
        }

        let display_name = display_name.map(|value| value.trim().to_string());
        let bio = bio.map(|value| value.trim().to_string());

        let updated = self
            .db
            .patch_user_profile(user_id, display_name.as_deref(), bio.as_deref())
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        self.get_user(user_id).await
    }

    /// Replace the account's avatar image
    ///
    /// # Arguments
    /// * `image_data` - Raw image bytes from the multipart upload
    /// * `content_type` - MIME type of the upload
    ///
    /// # Returns
    /// Public URL of the new avatar
    pub async fn update_avatar(
        &self,
        user_id: &str,
        image_data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        if image_data.is_empty() {
            return Err(AppError::Validation(
                "Avatar image data is empty".to_string(),
            ));
        }

        let user = self.get_user(user_id).await?;
        let previous_key = user.avatar_s3_key.clone();

        let image_id = EntityId::new().0;
        let (avatar_s3_key, avatar_url) = self
            .storage
            .upload_avatar(&image_id, image_data, content_type)
            .await?;

        let updated = match self
            .db
            .update_user_avatar_key(user_id, Some(&avatar_s3_key))
            .await
        {
            Ok(updated) => updated,
            Err(error) => {
                if let Err(cleanup_error) = self.storage.delete(&avatar_s3_key).await {
                    tracing::warn!(
                        key = %avatar_s3_key,
                        error = %cleanup_error,
                        "failed to rollback uploaded avatar after database update error"
                    );
                }
                return Err(error);
            }
        };
        if !updated {
            if let Err(cleanup_error) = self.storage.delete(&avatar_s3_key).await {
                tracing::warn!(
                    key = %avatar_s3_key,
                    error = %cleanup_error,
                    "failed to rollback uploaded avatar after account disappeared"
                );
            }
            return Err(AppError::NotFound);
        }

        if let Some(old_key) = previous_key.as_deref().filter(|old| *old != avatar_s3_key) {
            if let Err(error) = self.storage.delete(old_key).await {
                tracing::warn!(
                    key = %old_key,
                    error = %error,
                    "failed to delete previous avatar from storage"
                );
            }
        }

        Ok(avatar_url)
    }

    /// Delete the account
    ///
    /// Follow edges on both sides, owned posts and comments, and likes
    /// are removed with the user row in one cascading statement.
    pub async fn delete_account(&self, user_id: &str) -> Result<(), AppError> {
        let user = self.get_user(user_id).await?;

        let deleted = self.db.delete_user(user_id).await?;
        if !deleted {
            return Err(AppError::NotFound);
        }

        if let Some(avatar_key) = user.avatar_s3_key.as_deref() {
            if let Err(error) = self.storage.delete(avatar_key).await {
                tracing::warn!(
                    key = %avatar_key,
                    error = %error,
                    "failed to delete avatar for removed account"
                );
            }
        }

        tracing::info!(username = %user.username, "Account deleted");

        Ok(())
    }

    /// Search accounts by username or display name substring
    /// (case-insensitive), at most 10 results.
    pub async fn search(&self, query: &str) -> Result<Vec<User>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation(
                "query parameter is required".to_string(),
            ));
        }

        self.db.search_users(query, SEARCH_RESULT_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_db() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-account.db");
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

    async fn create_service() -> (AccountService, TempDir) {
        let (db, temp_dir) = create_test_db().await;
        let storage = create_test_storage().await;
        (AccountService::new(db, storage), temp_dir)
    }

    #[tokio::test]
    async fn register_creates_account_and_hashes_password() {
        let (service, _temp_dir) = create_service().await;

        let user = service
            .register(
                " alice ".to_string(),
                "Alice@Example.com".to_string(),
                "secret123".to_string(),
                Some("Alice Liddell".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.password_hash.starts_with("$argon2"));
        assert_eq!(user.display_name, Some("Alice Liddell".to_string()));
    }

    #[tokio::test]
    async fn register_rejects_invalid_fields() {
        let (service, _temp_dir) = create_service().await;

        let short_username = service
            .register(
                "ab".to_string(),
                "a@example.com".to_string(),
                "secret123".to_string(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(short_username, AppError::Validation(_)));

        let bad_email = service
            .register(
                "alice".to_string(),
                "not-an-email".to_string(),
                "secret123".to_string(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(bad_email, AppError::Validation(_)));

        let short_password = service
            .register(
                "alice".to_string(),
                "a@example.com".to_string(),
                "short".to_string(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(short_password, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_taken_username_and_email() {
        let (service, _temp_dir) = create_service().await;

        service
            .register(
                "alice".to_string(),
                "alice@example.com".to_string(),
                "secret123".to_string(),
                None,
            )
            .await
            .unwrap();

        let taken_username = service
            .register(
                "ALICE".to_string(),
                "other@example.com".to_string(),
                "secret123".to_string(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            taken_username,
            AppError::Validation(message) if message.contains("Username")
        ));

        let taken_email = service
            .register(
                "someone".to_string(),
                "ALICE@example.com".to_string(),
                "secret123".to_string(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            taken_email,
            AppError::Validation(message) if message.contains("Email")
        ));
    }

    #[tokio::test]
    async fn login_verifies_credentials() {
        let (service, _temp_dir) = create_service().await;

        service
            .register(
                "alice".to_string(),
                "alice@example.com".to_string(),
                "secret123".to_string(),
                None,
            )
            .await
            .unwrap();

        let user = service
            .login("alice@example.com".to_string(), "secret123".to_string())
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let wrong_password = service
            .login("alice@example.com".to_string(), "wrong".to_string())
            .await
            .unwrap_err();
        assert!(matches!(
            wrong_password,
            AppError::Validation(message) if message == "Invalid credentials"
        ));

        let unknown_email = service
            .login("nobody@example.com".to_string(), "secret123".to_string())
            .await
            .unwrap_err();
        assert!(matches!(
            unknown_email,
            AppError::Validation(message) if message == "Invalid credentials"
        ));
    }

    #[tokio::test]
    async fn update_profile_changes_only_provided_fields() {
        let (service, _temp_dir) = create_service().await;

        let user = service
            .register(
                "alice".to_string(),
                "alice@example.com".to_string(),
                "secret123".to_string(),
                Some("Alice".to_string()),
            )
            .await
            .unwrap();

        let updated = service
            .update_profile(&user.id, None, Some("Down the rabbit hole".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.display_name, Some("Alice".to_string()));
        assert_eq!(updated.bio, Some("Down the rabbit hole".to_string()));

        let oversized_bio = "x".repeat(501);
        let error = service
            .update_profile(&user.id, None, Some(oversized_bio))
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_account_is_terminal() {
        let (service, _temp_dir) = create_service().await;

        let user = service
            .register(
                "alice".to_string(),
                "alice@example.com".to_string(),
                "secret123".to_string(),
                None,
            )
            .await
            .unwrap();

        service.delete_account(&user.id).await.unwrap();

        let error = service.get_user(&user.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));

        let error = service.delete_account(&user.id).await.unwrap_err();
        assert!(matches!(error, AppError::NotFound));
    }

    #[tokio::test]
    async fn search_requires_query() {
        let (service, _temp_dir) = create_service().await;

        let error = service.search("   ").await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }
}
