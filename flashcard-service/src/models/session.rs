//! Conversation session held in memory for follow-up questions.

use super::{Flashcard, MediaReference};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One content item inside a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    Media { media: MediaReference },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn media(media: MediaReference) -> Self {
        Part::Media { media }
    }
}

/// A single exchange unit tagged by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }
}

/// Conversation state for one session key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Ordered conversation history, oldest first.
    pub history: Vec<Turn>,

    /// Flashcards extracted by the most recent upload.
    pub flashcards: Vec<Flashcard>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(history: Vec<Turn>, flashcards: Vec<Flashcard>) -> Self {
        let now = Utc::now();
        Self {
            history,
            flashcards,
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a turn to the end of the history.
    pub fn push_turn(&mut self, turn: Turn) {
        self.history.push(turn);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_turn_appends_in_order() {
        let mut session = Session::new(Vec::new(), Vec::new());
        session.push_turn(Turn::user(vec![Part::text("What is praxis?")]));
        session.push_turn(Turn::model_text("Theory enacted."));

        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, Role::User);
        assert_eq!(session.history[1].role, Role::Model);
        assert!(session.updated_at >= session.created_at);
    }

    #[test]
    fn roles_serialize_lowercase() {
        assert_eq!(serde_json::to_value(Role::Model).unwrap(), "model");
        assert_eq!(Role::User.as_str(), "user");
    }
}
