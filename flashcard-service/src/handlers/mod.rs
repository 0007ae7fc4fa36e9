//! HTTP handlers for the flashcard service.

pub mod app;
pub mod chat;
pub mod health;
pub mod upload;

pub use app::index;
pub use chat::chat;
pub use health::{health_check, readiness_check};
pub use upload::upload_media;
