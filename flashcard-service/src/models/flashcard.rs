//! Flashcards extracted from provider output.

use serde::{Deserialize, Serialize};

/// Number of flashcards the analysis prompt asks for. Not enforced.
pub const EXPECTED_FLASHCARDS: usize = 4;

const FALLBACK_TITLE: &str = "Assimilation";
const FALLBACK_DESCRIPTION: &str = "The media essence has been captured.";

/// A title/description pair summarizing one concept from the media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub title: String,
    pub description: String,
}

impl Flashcard {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.description.trim().is_empty()
    }
}

/// The single placeholder card used when the provider output is unusable.
pub fn fallback_flashcards() -> Vec<Flashcard> {
    vec![Flashcard::new(FALLBACK_TITLE, FALLBACK_DESCRIPTION)]
}

/// Remove markdown code-fence markers (```json and ```) and surrounding
/// whitespace from a model response.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse provider output into flashcards.
///
/// Anything that is not a non-empty JSON array of complete cards yields the
/// fallback card; malformed output never reaches the caller as an error.
pub fn parse_flashcards(raw: &str) -> Vec<Flashcard> {
    let cleaned = strip_code_fences(raw);

    match serde_json::from_str::<Vec<Flashcard>>(&cleaned) {
        Ok(cards) if !cards.is_empty() && cards.iter().all(Flashcard::is_complete) => {
            if cards.len() != EXPECTED_FLASHCARDS {
                tracing::warn!(
                    count = cards.len(),
                    expected = EXPECTED_FLASHCARDS,
                    "Provider returned an unexpected number of flashcards"
                );
            }
            cards
        }
        Ok(cards) => {
            tracing::warn!(
                count = cards.len(),
                "Provider returned empty or incomplete flashcards, using fallback"
            );
            fallback_flashcards()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse flashcards, using fallback");
            fallback_flashcards()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n[{\"title\":\"A\",\"description\":\"B\"}]\n```";
        assert_eq!(parse_flashcards(raw), vec![Flashcard::new("A", "B")]);
    }

    #[test]
    fn strips_bare_code_fence() {
        let raw = "```\n[{\"title\":\"Dialectic\",\"description\":\"Thesis meets antithesis.\"}]\n```";
        let cards = parse_flashcards(raw);
        assert_eq!(cards[0].title, "Dialectic");
    }

    #[test]
    fn accepts_unfenced_array_of_four() {
        let raw = r#"[
            {"title": "Stoicism", "description": "Virtue as the sole good."},
            {"title": "Telos", "description": "The end toward which a thing aims."},
            {"title": "Praxis", "description": "Theory enacted."},
            {"title": "Episteme", "description": "Justified knowledge."}
        ]"#;
        assert_eq!(parse_flashcards(raw).len(), 4);
    }

    #[test]
    fn keeps_unexpected_card_counts() {
        let raw = r#"[{"title": "One", "description": "Only one."}]"#;
        assert_eq!(parse_flashcards(raw), vec![Flashcard::new("One", "Only one.")]);
    }

    #[test]
    fn prose_falls_back() {
        let cards = parse_flashcards("I could not find any concepts in this media.");
        assert_eq!(cards, fallback_flashcards());
    }

    #[test]
    fn object_instead_of_array_falls_back() {
        let cards = parse_flashcards(r#"{"title": "A", "description": "B"}"#);
        assert_eq!(cards, fallback_flashcards());
    }

    #[test]
    fn empty_array_and_blank_fields_fall_back() {
        assert_eq!(parse_flashcards("[]"), fallback_flashcards());
        assert_eq!(
            parse_flashcards(r#"[{"title": " ", "description": "B"}]"#),
            fallback_flashcards()
        );
    }

    #[test]
    fn fallback_card_is_complete() {
        let cards = fallback_flashcards();
        assert_eq!(cards.len(), 1);
        assert!(cards.iter().all(Flashcard::is_complete));
    }
}
