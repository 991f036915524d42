//! Follow graph service
//!
//! Directed follow edges between accounts. Only the follower side may
//! create or remove an edge.

use std::sync::Arc;

use crate::data::{Database, EntityId, Follow, FollowEdgeProfile};
use crate::error::AppError;

/// Follow graph service
pub struct FollowService {
    db: Arc<Database>,
}

impl FollowService {
    /// Create new follow service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Follow an account
    ///
    /// # Errors
    /// * `NotFound` if the target account does not exist
    /// * Validation error on self-follow (checked before target
    ///   existence so it always fails) or a duplicate edge
    pub async fn follow(&self, follower_id: &str, target_id: &str) -> Result<Follow, AppError> {
        if follower_id == target_id {
            return Err(AppError::Validation("Cannot follow yourself".to_string()));
        }

        if self.db.get_user(target_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let follow = Follow {
            id: EntityId::new().0,
            follower_id: follower_id.to_string(),
            following_id: target_id.to_string(),
            created_at: chrono::Utc::now(),
        };

        let inserted = self.db.insert_follow(&follow).await?;
        if !inserted {
            return Err(AppError::Validation(
                "Already following this user".to_string(),
            ));
        }

        Ok(follow)
    }

    /// Unfollow an account
    ///
    /// # Errors
    /// `NotFound` if no edge exists for the pair
    pub async fn unfollow(&self, follower_id: &str, target_id: &str) -> Result<(), AppError> {
        let removed = self.db.delete_follow(follower_id, target_id).await?;
        if !removed {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    /// Check whether `viewer_id` follows `target_id`
    pub async fn is_following(&self, viewer_id: &str, target_id: &str) -> Result<bool, AppError> {
        self.db.is_following(viewer_id, target_id).await
    }

    /// List follower edges of an account, newest first, peers resolved
    pub async fn followers(&self, user_id: &str) -> Result<Vec<FollowEdgeProfile>, AppError> {
        self.db.list_followers(user_id).await
    }

    /// List following edges of an account, newest first, peers resolved
    pub async fn following(&self, user_id: &str) -> Result<Vec<FollowEdgeProfile>, AppError> {
        self.db.list_following(user_id).await
    }
}
