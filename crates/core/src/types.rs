//! Domain types for extracted decks and their analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used for any context field the model could not determine.
pub const UNKNOWN: &str = "Unknown";

/// Extracted text and presenter notes for one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 1-based slide number.
    pub slide_number: usize,

    /// Non-blank shape texts, in shape order, joined with newlines.
    pub slide_text: String,

    /// Presenter notes, trimmed. Empty when the slide has no notes page.
    pub notes_text: String,

    /// Whether `notes_text` is non-empty.
    pub has_notes: bool,
}

impl SlideRecord {
    /// Build a record, deriving `has_notes` from the notes text.
    pub fn new(slide_number: usize, slide_text: impl Into<String>, notes_text: impl Into<String>) -> Self {
        let notes_text = notes_text.into().trim().to_string();
        Self {
            slide_number,
            slide_text: slide_text.into(),
            has_notes: !notes_text.is_empty(),
            notes_text,
        }
    }

    /// Slide text followed by notes, in the shape used for per-slide prompts.
    pub fn prompt_content(&self) -> String {
        let mut content = format!("Slide content: {}", self.slide_text);
        if self.has_notes {
            content.push_str("\nNotes: ");
            content.push_str(&self.notes_text);
        }
        content
    }
}

/// The communicative goal of a deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    Inform,
    Persuade,
    Propose,
    Educate,
    Report,
    Pitch,
    Review,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Purpose {
    /// The closed vocabulary the model is allowed to answer with.
    pub const ALLOWED: [Purpose; 7] = [
        Purpose::Inform,
        Purpose::Persuade,
        Purpose::Propose,
        Purpose::Educate,
        Purpose::Report,
        Purpose::Pitch,
        Purpose::Review,
    ];

    /// Map free text onto the vocabulary; anything else becomes `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        Self::ALLOWED
            .into_iter()
            .find(|p| p.as_str() == label)
            .unwrap_or(Purpose::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Inform => "inform",
            Purpose::Persuade => "persuade",
            Purpose::Propose => "propose",
            Purpose::Educate => "educate",
            Purpose::Report => "report",
            Purpose::Pitch => "pitch",
            Purpose::Review => "review",
            Purpose::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context fields a user may fill in by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    Topic,
    Region,
}

/// Deck-level metadata inferred from the opening slides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckContext {
    pub topic: String,
    pub region: String,
    pub purpose: Purpose,
}

impl Default for DeckContext {
    fn default() -> Self {
        Self::unknown()
    }
}

impl DeckContext {
    /// The all-"Unknown" context.
    pub fn unknown() -> Self {
        Self {
            topic: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            purpose: Purpose::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }

    /// Set a field from user input, only if the model left it as "Unknown".
    ///
    /// Returns true if the field changed.
    pub fn fill_unknown(&mut self, field: ContextField, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let slot = match field {
            ContextField::Topic => &mut self.topic,
            ContextField::Region => &mut self.region,
        };
        if slot != UNKNOWN {
            return false;
        }
        *slot = value.to_string();
        true
    }
}

/// Model output for a single slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideInsight {
    /// Key point of the slide.
    pub summary: String,
    /// Design tip; "—" when the model answer had no second part.
    pub design_note: String,
    pub layout_suggestion: String,
    pub chart_suggestion: String,
}

/// Complete analysis of a deck.
///
/// `per_slide` is aligned 1:1 with the slide records it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub deck_summary: String,
    pub context: DeckContext,
    pub per_slide: Vec<SlideInsight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the deck question transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generated visual idea for a slide.
///
/// The prompt is always present; the image is best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualConcept {
    pub prompt: String,
    pub image_url: Option<String>,
    pub image_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_notes_follows_trimmed_notes() {
        assert!(!SlideRecord::new(1, "Hello", "").has_notes);
        assert!(!SlideRecord::new(1, "Hello", "  \n\t ").has_notes);

        let slide = SlideRecord::new(2, "", "  Speak slowly \n");
        assert!(slide.has_notes);
        assert_eq!(slide.notes_text, "Speak slowly");
    }

    #[test]
    fn test_prompt_content_includes_notes_only_when_present() {
        let plain = SlideRecord::new(1, "Revenue up", "");
        assert_eq!(plain.prompt_content(), "Slide content: Revenue up");

        let noted = SlideRecord::new(1, "Revenue up", "Mention Q4");
        assert_eq!(
            noted.prompt_content(),
            "Slide content: Revenue up\nNotes: Mention Q4"
        );
    }

    #[test]
    fn test_purpose_from_label() {
        assert_eq!(Purpose::from_label("inform"), Purpose::Inform);
        assert_eq!(Purpose::from_label("  PITCH "), Purpose::Pitch);
        assert_eq!(Purpose::from_label("entertain"), Purpose::Unknown);
        assert_eq!(Purpose::from_label(""), Purpose::Unknown);
    }

    #[test]
    fn test_purpose_serde_names() {
        assert_eq!(serde_json::to_string(&Purpose::Review).unwrap(), "\"review\"");
        assert_eq!(serde_json::to_string(&Purpose::Unknown).unwrap(), "\"Unknown\"");
    }

    #[test]
    fn test_fill_unknown_only_replaces_unknown() {
        let mut ctx = DeckContext::unknown();
        assert!(ctx.fill_unknown(ContextField::Topic, "Q3 Review"));
        assert_eq!(ctx.topic, "Q3 Review");

        // Already known: untouched.
        assert!(!ctx.fill_unknown(ContextField::Topic, "Something else"));
        assert_eq!(ctx.topic, "Q3 Review");

        // Blank input is ignored.
        assert!(!ctx.fill_unknown(ContextField::Region, "   "));
        assert_eq!(ctx.region, UNKNOWN);
    }
}
