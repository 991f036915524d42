//! Service layer
//!
//! Business logic between the HTTP handlers and the data layer.

mod account;
mod comment;
mod feed;
mod follow;
mod post;

pub use account::AccountService;
pub use comment::{CommentService, CommentView};
pub use feed::{FeedPage, FeedService, PostView};
pub use follow::FollowService;
pub use post::PostService;

use crate::error::AppError;

/// Ownership check applied before every mutation of an owned resource.
///
/// Callers look the resource up first, so a failure here always means
/// "present, not yours" (403) and never "absent" (404).
pub(crate) fn ensure_owner(owner_id: &str, actor_id: &str, denial: &str) -> Result<(), AppError> {
    if owner_id == actor_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(denial.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_owner_accepts_owner() {
        assert!(ensure_owner("user-1", "user-1", "nope").is_ok());
    }

    #[test]
    fn ensure_owner_rejects_non_owner_with_message() {
        let error = ensure_owner("user-1", "user-2", "Not authorized").unwrap_err();
        assert!(matches!(
            error,
            AppError::Forbidden(message) if message == "Not authorized"
        ));
    }
}
