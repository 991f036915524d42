//! API response projections
//!
//! Wire shapes returned to clients. Keys are camelCase; the password
//! hash never appears here because `User` itself is not serializable.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{Follow, FollowEdgeProfile, User};
use crate::service::{CommentView, FeedPage, PostView};
use crate::storage::MediaStorage;

fn avatar_url(storage: &MediaStorage, key: Option<&str>) -> Option<String> {
    key.map(|key| storage.get_public_url(key))
}

/// Public fields of an account, embedded in posts, comments, and
/// follow listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserSummary {
    pub fn from_user(user: &User, storage: &MediaStorage) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: avatar_url(storage, user.avatar_s3_key.as_deref()),
        }
    }

    fn from_parts(
        id: &str,
        username: &str,
        display_name: Option<&str>,
        avatar_key: Option<&str>,
        storage: &MediaStorage,
    ) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            display_name: display_name.map(ToOwned::to_owned),
            avatar_url: avatar_url(storage, avatar_key),
        }
    }
}

/// Full profile view of an account
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn from_user(
        user: &User,
        followers_count: i64,
        following_count: i64,
        storage: &MediaStorage,
    ) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            bio: user.bio.clone(),
            avatar_url: avatar_url(storage, user.avatar_s3_key.as_deref()),
            followers_count,
            following_count,
            created_at: user.created_at,
        }
    }
}

/// A follow edge as returned from follow mutations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

impl FollowResponse {
    pub fn from_follow(follow: &Follow) -> Self {
        Self {
            id: follow.id.clone(),
            follower_id: follow.follower_id.clone(),
            following_id: follow.following_id.clone(),
            created_at: follow.created_at,
        }
    }
}

/// A follow edge resolved to the peer account, for follower/following
/// listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEdgeResponse {
    pub id: String,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
}

impl FollowEdgeResponse {
    pub fn from_profile(edge: &FollowEdgeProfile, storage: &MediaStorage) -> Self {
        Self {
            id: edge.id.clone(),
            user: UserSummary::from_parts(
                &edge.user_id,
                &edge.username,
                edge.display_name.as_deref(),
                edge.avatar_s3_key.as_deref(),
                storage,
            ),
            created_at: edge.created_at,
        }
    }
}

/// A comment with author and like-set
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub user: UserSummary,
    pub content: String,
    pub likes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn from_view(view: &CommentView, storage: &MediaStorage) -> Self {
        Self {
            id: view.comment.id.clone(),
            post_id: view.comment.post_id.clone(),
            user: UserSummary::from_parts(
                &view.comment.user_id,
                &view.comment.author_username,
                view.comment.author_display_name.as_deref(),
                view.comment.author_avatar_s3_key.as_deref(),
                storage,
            ),
            content: view.comment.content.clone(),
            likes: view.likes.clone(),
            created_at: view.comment.created_at,
            updated_at: view.comment.updated_at,
        }
    }
}

/// A post with author, like-set, comment count, and recent comments
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub user: UserSummary,
    pub content: String,
    pub image_url: Option<String>,
    pub likes: Vec<String>,
    pub comment_count: i64,
    /// Up to the configured number of most-recent comments
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn from_view(view: &PostView, storage: &MediaStorage) -> Self {
        Self {
            id: view.post.id.clone(),
            user: UserSummary::from_parts(
                &view.post.user_id,
                &view.post.author_username,
                view.post.author_display_name.as_deref(),
                view.post.author_avatar_s3_key.as_deref(),
                storage,
            ),
            content: view.post.content.clone(),
            image_url: view
                .post
                .image_s3_key
                .as_deref()
                .map(|key| storage.get_public_url(key)),
            likes: view.likes.clone(),
            comment_count: view.comment_count,
            comments: view
                .recent_comments
                .iter()
                .map(|comment| CommentResponse::from_view(comment, storage))
                .collect(),
            created_at: view.post.created_at,
            updated_at: view.post.updated_at,
        }
    }
}

/// One page of a feed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub posts: Vec<PostResponse>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_posts: i64,
}

impl FeedResponse {
    pub fn from_page(page: &FeedPage, storage: &MediaStorage) -> Self {
        Self {
            posts: page
                .posts
                .iter()
                .map(|view| PostResponse::from_view(view, storage))
                .collect(),
            current_page: page.current_page,
            total_pages: page.total_pages,
            total_posts: page.total_posts,
        }
    }
}
