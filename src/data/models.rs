//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered account
///
/// Deliberately does NOT implement `Serialize`: the password hash must
/// never reach a client. API projections go through `api::dto` instead.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Argon2 password hash (PHC string format)
    pub password_hash: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// S3 key for avatar image
    pub avatar_s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Follow graph
// =============================================================================

/// A directed follow edge (follower -> following)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

/// A follow edge joined with the peer account's public fields.
///
/// For a followers listing the peer is the follower; for a following
/// listing the peer is the account being followed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowEdgeProfile {
    /// Follow edge ID
    pub id: String,
    /// When the edge was created
    pub created_at: DateTime<Utc>,
    /// Peer account ID
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_s3_key: Option<String>,
}

// =============================================================================
// Post
// =============================================================================

/// A post
///
/// Content may be empty when an image is attached; creation enforces
/// that at least one of the two is present. The image is immutable
/// after creation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    /// Owner account ID
    pub user_id: String,
    pub content: String,
    /// S3 key for the attached image
    pub image_s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post row joined with its author's public fields.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithAuthor {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub image_s3_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_s3_key: Option<String>,
}

// =============================================================================
// Comment
// =============================================================================

/// A comment on a post
///
/// Membership in the parent post's comment list is derived by querying
/// on `post_id`; no id list is stored on the post row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    /// Parent post ID
    pub post_id: String,
    /// Owner account ID
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment row joined with its author's public fields.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_s3_key: Option<String>,
}
