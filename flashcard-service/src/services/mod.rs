pub mod gateway;
pub mod media_store;
pub mod providers;
pub mod retry;
pub mod session_store;

pub use gateway::AiGateway;
pub use media_store::{MediaStore, StagedMedia};
pub use session_store::{SessionError, SessionStore};
