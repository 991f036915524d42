//! Post and feed endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::AppState;
use crate::api::dto::{FeedResponse, PostResponse};
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{DB_QUERIES_TOTAL, HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};
use crate::service::{FeedService, PostService};

const MAX_POST_IMAGE_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

fn build_post_service(state: &AppState) -> PostService {
    PostService::new(state.db.clone(), state.storage.clone())
}

fn build_feed_service(state: &AppState) -> FeedService {
    FeedService::new(state.db.clone(), state.config.feed.comment_preview_count)
}

/// Feed pagination parameters
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl FeedParams {
    /// Resolve page/limit against configured defaults and caps.
    fn resolve(&self, config: &crate::config::FeedConfig) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(config.default_page_size)
            .clamp(1, config.max_page_size);
        (page, limit)
    }
}

/// Post update request
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub content: Option<String>,
}

/// POST /api/posts
///
/// Multipart fields: `content` text, optional `image` file.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/posts"])
        .start_timer();

    let mut content: Option<String> = None;
    let mut image: Option<(Vec<u8>, String)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "content" => {
                content = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read content: {}", e))
                })?);
            }
            "image" => {
                image = Some(
                    super::users::read_image_field(&mut field, MAX_POST_IMAGE_UPLOAD_BYTES).await?,
                );
            }
            _ => {}
        }
    }

    let post_service = build_post_service(&state);
    let feed_service = build_feed_service(&state);

    let row = post_service.create(&session.user_id, content, image).await?;
    let view = feed_service.hydrate(row).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/posts", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Post created successfully",
            "post": PostResponse::from_view(&view, &state.storage),
        })),
    ))
}

/// GET /api/posts
///
/// Paginated global feed, newest-first.
pub async fn get_posts(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/posts"])
        .start_timer();

    let (page, limit) = params.resolve(&state.config.feed);
    let feed_service = build_feed_service(&state);
    let feed = feed_service.global(page, limit).await?;
    DB_QUERIES_TOTAL.with_label_values(&["SELECT", "posts"]).inc();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/posts", "200"])
        .inc();

    Ok(Json(FeedResponse::from_page(&feed, &state.storage)))
}

/// GET /api/posts/user/:user_id
pub async fn get_user_posts(
    State(state): State<AppState>,
    CurrentUser(_session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let feed_service = build_feed_service(&state);
    let views = feed_service.by_user(&user_id).await?;

    let posts: Vec<_> = views
        .iter()
        .map(|view| PostResponse::from_view(view, &state.storage))
        .collect();

    Ok(Json(serde_json::json!({ "posts": posts })))
}

/// GET /api/posts/following
///
/// Posts authored by accounts the viewer follows, paginated like the
/// global feed.
pub async fn get_following_posts(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    let (page, limit) = params.resolve(&state.config.feed);
    let feed_service = build_feed_service(&state);
    let feed = feed_service.following(&session.user_id, page, limit).await?;
    DB_QUERIES_TOTAL.with_label_values(&["SELECT", "posts"]).inc();

    Ok(Json(FeedResponse::from_page(&feed, &state.storage)))
}

/// PUT /api/posts/:id
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post_service = build_post_service(&state);
    let feed_service = build_feed_service(&state);

    let row = post_service.update(&session.user_id, &id, req.content).await?;
    let view = feed_service.hydrate(row).await?;

    Ok(Json(serde_json::json!({
        "message": "Post updated successfully",
        "post": PostResponse::from_view(&view, &state.storage),
    })))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post_service = build_post_service(&state);
    post_service.delete(&session.user_id, &id).await?;

    Ok(Json(serde_json::json!({
        "message": "Post deleted successfully",
    })))
}

/// POST /api/posts/:id/like
///
/// Flips the acting account's membership in the like-set.
pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let post_service = build_post_service(&state);
    let (liked, likes) = post_service.toggle_like(&session.user_id, &id).await?;

    let message = if liked { "Post liked" } else { "Post unliked" };
    Ok(Json(serde_json::json!({
        "message": message,
        "likes": likes,
    })))
}
