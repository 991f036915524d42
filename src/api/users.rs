//! User profile, follow graph, and search endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    response::Json,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::dto::{FollowEdgeResponse, FollowResponse, ProfileResponse, UserSummary};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::{AccountService, FollowService};

const MAX_AVATAR_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const SUPPORTED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

fn build_account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.storage.clone())
}

fn build_follow_service(state: &AppState) -> FollowService {
    FollowService::new(state.db.clone())
}

/// Search query parameters
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// Read an image field from a multipart form, enforcing the size cap
/// and supported MIME types.
///
/// # Returns
/// (bytes, content type)
pub(super) async fn read_image_field(
    field: &mut axum::extract::multipart::Field<'_>,
    max_bytes: usize,
) -> Result<(Vec<u8>, String), AppError> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Validation("Missing content type for uploaded file".to_string()))?;

    if !SUPPORTED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported image type: {}",
            content_type
        )));
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?
    {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(AppError::Validation(format!(
                "File too large: exceeds {} bytes",
                max_bytes
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    if bytes.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }

    Ok((bytes, content_type))
}

/// PUT /api/users/profile
///
/// Multipart fields: `displayName`, `bio`, optional `avatar` image.
/// All other account fields are immutable through this path.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut display_name: Option<String> = None;
    let mut bio: Option<String> = None;
    let mut avatar: Option<(Vec<u8>, String)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "displayName" => {
                display_name = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read displayName: {}", e))
                })?);
            }
            "bio" => {
                bio = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read bio: {}", e)))?,
                );
            }
            "avatar" => {
                avatar = Some(read_image_field(&mut field, MAX_AVATAR_UPLOAD_BYTES).await?);
            }
            _ => {}
        }
    }

    let account_service = build_account_service(&state);
    account_service
        .update_profile(&session.user_id, display_name, bio)
        .await?;

    if let Some((data, content_type)) = avatar {
        account_service
            .update_avatar(&session.user_id, data, &content_type)
            .await?;
        crate::metrics::MEDIA_UPLOADS_TOTAL.inc();
    }

    let (user, followers, following) = account_service.profile(&session.user_id).await?;
    let profile = ProfileResponse::from_user(&user, followers, following, &state.storage);

    Ok(Json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": profile,
    })))
}

/// DELETE /api/users/profile
pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let account_service = build_account_service(&state);
    account_service.delete_account(&session.user_id).await?;

    Ok(Json(serde_json::json!({
        "message": "Account deleted successfully",
    })))
}

/// GET /api/users/:id
///
/// Profile plus whether the viewer follows this account.
pub async fn get_user_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let account_service = build_account_service(&state);
    let follow_service = build_follow_service(&state);

    let (user, followers, following) = account_service.profile(&id).await?;
    let is_following = follow_service.is_following(&session.user_id, &id).await?;

    let profile = ProfileResponse::from_user(&user, followers, following, &state.storage);

    Ok(Json(serde_json::json!({
        "user": profile,
        "isFollowing": is_following,
    })))
}

/// POST /api/users/:id/follow
pub async fn follow_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let follow_service = build_follow_service(&state);
    let follow = follow_service.follow(&session.user_id, &id).await?;

    Ok(Json(serde_json::json!({
        "message": "Followed successfully",
        "follow": FollowResponse::from_follow(&follow),
    })))
}

/// POST /api/users/:id/unfollow
pub async fn unfollow_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let follow_service = build_follow_service(&state);
    follow_service.unfollow(&session.user_id, &id).await?;

    Ok(Json(serde_json::json!({
        "message": "Unfollowed successfully",
    })))
}

/// GET /api/users/:id/followers
pub async fn get_followers(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let follow_service = build_follow_service(&state);
    let edges = follow_service.followers(&id).await?;

    let followers: Vec<_> = edges
        .iter()
        .map(|edge| FollowEdgeResponse::from_profile(edge, &state.storage))
        .collect();

    Ok(Json(serde_json::json!({ "followers": followers })))
}

/// GET /api/users/:id/following
pub async fn get_following(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let follow_service = build_follow_service(&state);
    let edges = follow_service.following(&id).await?;

    let following: Vec<_> = edges
        .iter()
        .map(|edge| FollowEdgeResponse::from_profile(edge, &state.storage))
        .collect();

    Ok(Json(serde_json::json!({ "following": following })))
}

/// GET /api/users/search/users?query=
pub async fn search_users(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let account_service = build_account_service(&state);
    let users = account_service
        .search(params.query.as_deref().unwrap_or(""))
        .await?;

    let users: Vec<_> = users
        .iter()
        .map(|user| UserSummary::from_user(user, &state.storage))
        .collect();

    Ok(Json(serde_json::json!({ "users": users })))
}
