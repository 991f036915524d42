//! Storage module
//!
//! Cloudflare R2 media storage (avatars and post images).

mod media;

pub use media::MediaStorage;
