//! Registration and login endpoints

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;

use crate::AppState;
use crate::api::dto::ProfileResponse;
use crate::auth::session::{Session, create_session_token};
use crate::error::AppError;
use crate::service::AccountService;

fn build_account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.storage.clone())
}

fn issue_token(state: &AppState, user_id: &str, username: &str) -> Result<String, AppError> {
    let session = Session::for_user(user_id, username, state.config.auth.session_max_age);
    create_session_token(&session, &state.config.auth.session_secret)
}

/// Registration request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let username = req
        .username
        .ok_or_else(|| AppError::Validation("Username is required".to_string()))?;
    let email = req
        .email
        .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;
    let password = req
        .password
        .ok_or_else(|| AppError::Validation("Password is required".to_string()))?;

    let account_service = build_account_service(&state);
    let user = account_service
        .register(username, email, password, req.display_name)
        .await?;

    let token = issue_token(&state, &user.id, &user.username)?;
    let profile = ProfileResponse::from_user(&user, 0, 0, &state.storage);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "token": token,
            "user": profile,
        })),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = req
        .email
        .ok_or_else(|| AppError::Validation("Email is required".to_string()))?;
    let password = req
        .password
        .ok_or_else(|| AppError::Validation("Password is required".to_string()))?;

    let account_service = build_account_service(&state);
    let user = account_service.login(email, password).await?;

    let token = issue_token(&state, &user.id, &user.username)?;
    let (user, followers, following) = account_service.profile(&user.id).await?;
    let profile = ProfileResponse::from_user(&user, followers, following, &state.storage);

    Ok(Json(serde_json::json!({
        "token": token,
        "user": profile,
    })))
}
