use crate::models::Flashcard;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatForm {
    #[validate(length(min = 1, message = "query must not be empty"))]
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}
