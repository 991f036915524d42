//! API layer
//!
//! HTTP handlers for:
//! - Registration and login
//! - Users (profiles, follow graph, search)
//! - Posts and feeds
//! - Comments
//! - Metrics (Prometheus)

use axum::{
    Router,
    routing::{get, post, put},
};

mod auth;
mod comments;
mod dto;
pub mod metrics;
mod posts;
mod users;

pub use dto::*;
pub use metrics::metrics_router;

use crate::AppState;

/// Create the `/api` router
///
/// `/auth/*` routes are public; everything else requires a bearer
/// token, enforced by the `CurrentUser` extractor in each handler.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Registration and login
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Posts and feeds
        .route("/posts", post(posts::create_post).get(posts::get_posts))
        .route("/posts/following", get(posts::get_following_posts))
        .route("/posts/user/:user_id", get(posts::get_user_posts))
        .route(
            "/posts/:id",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/:id/like", post(posts::like_post))
        // Comments (":id" is the parent post for create/list,
        // the comment itself for update/delete)
        .route(
            "/comments/:id",
            post(comments::create_comment)
                .get(comments::get_post_comments)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/comments/:id/like", post(comments::like_comment))
        // Users
        .route(
            "/users/profile",
            put(users::update_profile).delete(users::delete_account),
        )
        .route("/users/search/users", get(users::search_users))
        .route("/users/:id", get(users::get_user_profile))
        .route("/users/:id/follow", post(users::follow_user))
        .route("/users/:id/unfollow", post(users::unfollow_user))
        .route("/users/:id/followers", get(users::get_followers))
        .route("/users/:id/following", get(users::get_following))
}
