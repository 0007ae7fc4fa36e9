//! Domain models for the flashcard service.

pub mod flashcard;
pub mod media;
pub mod session;

pub use flashcard::{fallback_flashcards, parse_flashcards, strip_code_fences, Flashcard};
pub use media::{FileState, MediaReference};
pub use session::{Part, Role, Session, Turn};
