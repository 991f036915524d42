//! Authentication module
//!
//! - `session`: HMAC-signed bearer tokens
//! - `password`: Argon2 password hashing
//! - `middleware`: request extractors

pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::CurrentUser;
pub use session::{Session, create_session_token, verify_session_token};
