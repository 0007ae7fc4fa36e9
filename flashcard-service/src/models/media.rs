//! Provider-side handles for uploaded media.

use serde::{Deserialize, Serialize};

/// Processing state the provider reports for an uploaded file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[default]
    #[serde(alias = "STATE_UNSPECIFIED")]
    Unspecified,
    Processing,
    Active,
    Failed,
}

/// Opaque reference to media owned by the provider.
///
/// Only the handle is kept here; the content lives with the provider and is
/// referred to by `uri` in later conversation turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// Provider resource name, e.g. `files/abc123`.
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    #[serde(default)]
    pub state: FileState,
}

impl MediaReference {
    pub fn is_processing(&self) -> bool {
        self.state == FileState::Processing
    }
}
