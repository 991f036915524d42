//! Comment endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::dto::CommentResponse;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::CommentService;

fn build_comment_service(state: &AppState) -> CommentService {
    CommentService::new(state.db.clone())
}

/// Comment create/update request
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

impl CommentRequest {
    fn content(self) -> Result<String, AppError> {
        self.content
            .ok_or_else(|| AppError::Validation("Comment content is required".to_string()))
    }
}

/// POST /api/comments/:post_id
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(post_id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let content = req.content()?;

    let comment_service = build_comment_service(&state);
    let view = comment_service
        .create(&session.user_id, &post_id, &content)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Comment added successfully",
            "comment": CommentResponse::from_view(&view, &state.storage),
        })),
    ))
}

/// GET /api/comments/:post_id
///
/// All comments on a post, newest-first.
pub async fn get_post_comments(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let comment_service = build_comment_service(&state);
    let views = comment_service.list_for_post(&post_id).await?;

    let comments: Vec<_> = views
        .iter()
        .map(|view| CommentResponse::from_view(view, &state.storage))
        .collect();

    Ok(Json(serde_json::json!({ "comments": comments })))
}

/// PUT /api/comments/:id
pub async fn update_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let content = req.content()?;

    let comment_service = build_comment_service(&state);
    let view = comment_service
        .update(&session.user_id, &id, &content)
        .await?;

    Ok(Json(serde_json::json!({
        "message": "Comment updated successfully",
        "comment": CommentResponse::from_view(&view, &state.storage),
    })))
}

/// DELETE /api/comments/:id
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let comment_service = build_comment_service(&state);
    comment_service.delete(&session.user_id, &id).await?;

    Ok(Json(serde_json::json!({
        "message": "Comment deleted successfully",
    })))
}

/// POST /api/comments/:id/like
///
/// Flips the acting account's membership in the like-set.
pub async fn like_comment(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let comment_service = build_comment_service(&state);
    let (liked, likes) = comment_service.toggle_like(&session.user_id, &id).await?;

    let message = if liked { "Comment liked" } else { "Comment unliked" };
    Ok(Json(serde_json::json!({
        "message": message,
        "likes": likes,
    })))
}
