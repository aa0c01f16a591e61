//! System instructions and user-content builders for every model call.

use crate::types::{DeckContext, SlideRecord};

/// How many leading slides the context step looks at.
pub const CONTEXT_WINDOW: usize = 7;

pub const CONTEXT_SYSTEM_PROMPT: &str = r#"Extract presentation metadata as JSON with:
- topic: Specific subject (e.g., "2024 Marketing Strategy")
- region: Geographic focus if mentioned
- purpose: Only from: inform|persuade|propose|educate|report|pitch|review

Rules:
1. Be SPECIFIC - avoid generic terms
2. For purpose, ONLY use allowed values
3. Return ONLY valid JSON like:
{"topic": "...", "region": "...", "purpose": "..."}"#;

pub const DECK_SUMMARY_SYSTEM_PROMPT: &str =
    "Summarize this presentation in <100 words for a busy executive.";

pub const KEY_POINT_SYSTEM_PROMPT: &str =
    "Provide:\n1. Key point (≤30 words)\n2. Design tip (≤20 words)";

pub const LAYOUT_SYSTEM_PROMPT: &str =
    "Recommend a slide layout for consulting-style presentations. Be specific about element placement.";

pub const CHART_SYSTEM_PROMPT: &str =
    "Suggest the best chart type for this content. If no chart fits, recommend an alternative visual.";

pub const IMAGE_PROMPT_SYSTEM_PROMPT: &str =
    "Create a detailed image prompt for a professional presentation slide.";

pub const QUESTION_SYSTEM_PROMPT: &str = "Answer questions about this presentation:";

/// Framing role of a slide within the context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideRole {
    Title,
    Agenda,
    Body,
}

impl SlideRole {
    /// The first slide, or any slide mentioning "title", frames the deck.
    pub fn classify(slide: &SlideRecord) -> Self {
        let text = slide.slide_text.to_lowercase();
        if slide.slide_number == 1 || text.contains("title") {
            SlideRole::Title
        } else if text.contains("agenda") {
            SlideRole::Agenda
        } else {
            SlideRole::Body
        }
    }
}

/// Tagged blocks for the non-empty slides among the first [`CONTEXT_WINDOW`].
pub fn context_blocks(slides: &[SlideRecord]) -> Vec<String> {
    slides
        .iter()
        .take(CONTEXT_WINDOW)
        .filter(|s| !s.slide_text.trim().is_empty())
        .map(|slide| {
            let mut block = match SlideRole::classify(slide) {
                SlideRole::Title => format!("TITLE SLIDE:\n{}", slide.slide_text),
                SlideRole::Agenda => format!("AGENDA SLIDE:\n{}", slide.slide_text),
                SlideRole::Body => format!("Slide {}:\n{}", slide.slide_number, slide.slide_text),
            };
            if slide.has_notes {
                block.push_str("\nNOTES: ");
                block.push_str(&slide.notes_text);
            }
            block
        })
        .collect()
}

pub fn context_user_prompt(slides: &[SlideRecord]) -> String {
    format!("SLIDE CONTENT:\n\n{}", context_blocks(slides).join("\n"))
}

/// Whole-deck text: every slide's content and notes, in order.
pub fn deck_user_prompt(slides: &[SlideRecord]) -> String {
    slides
        .iter()
        .map(|slide| {
            let mut segment = format!("Slide {} content:\n{}", slide.slide_number, slide.slide_text);
            if slide.has_notes {
                segment.push_str("\n\nNotes:\n");
                segment.push_str(&slide.notes_text);
            }
            segment
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn image_user_prompt(summary: &str, design_tip: &str, context: &DeckContext) -> String {
    let context_json = serde_json::to_string(context).unwrap_or_default();
    format!("Content: {summary}\nDesign tips: {design_tip}\nContext: {context_json}")
}

pub fn question_user_prompt(question: &str, deck_summary: &str) -> String {
    format!("Question: {question}\n\nPresentation Content:\n{deck_summary}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q3_deck() -> Vec<SlideRecord> {
        vec![
            SlideRecord::new(1, "Title: Q3 Review", ""),
            SlideRecord::new(2, "Agenda: Intro, Results, Next Steps", ""),
            SlideRecord::new(3, "", "Walk through the numbers"),
        ]
    }

    #[test]
    fn test_title_and_agenda_tags() {
        let blocks = context_blocks(&q3_deck());

        // Slide 3 has no visible text and is left out.
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "TITLE SLIDE:\nTitle: Q3 Review");
        assert_eq!(blocks[1], "AGENDA SLIDE:\nAgenda: Intro, Results, Next Steps");
    }

    #[test]
    fn test_title_keyword_beats_agenda() {
        let slide = SlideRecord::new(4, "Agenda and section TITLE", "");
        assert_eq!(SlideRole::classify(&slide), SlideRole::Title);
    }

    #[test]
    fn test_body_block_carries_number_and_notes() {
        let slides = vec![
            SlideRecord::new(1, "Welcome", ""),
            SlideRecord::new(2, "Revenue grew", "Stress margin"),
        ];
        let blocks = context_blocks(&slides);
        assert_eq!(blocks[1], "Slide 2:\nRevenue grew\nNOTES: Stress margin");
    }

    #[test]
    fn test_context_window_is_bounded() {
        let slides: Vec<SlideRecord> = (1..=12)
            .map(|n| SlideRecord::new(n, format!("Point {n}"), ""))
            .collect();
        let blocks = context_blocks(&slides);
        assert_eq!(blocks.len(), CONTEXT_WINDOW);
        assert!(blocks.last().unwrap().contains("Point 7"));

        let prompt = context_user_prompt(&slides);
        assert!(prompt.starts_with("SLIDE CONTENT:\n\n"));
        assert!(!prompt.contains("Point 8"));
    }

    #[test]
    fn test_deck_user_prompt() {
        let prompt = deck_user_prompt(&q3_deck());
        assert_eq!(
            prompt,
            "Slide 1 content:\nTitle: Q3 Review\n\n\
             Slide 2 content:\nAgenda: Intro, Results, Next Steps\n\n\
             Slide 3 content:\n\n\nNotes:\nWalk through the numbers"
        );
        assert_eq!(deck_user_prompt(&[]), "");
    }

    #[test]
    fn test_question_prompt() {
        assert_eq!(
            question_user_prompt("Who presents?", "A Q3 review."),
            "Question: Who presents?\n\nPresentation Content:\nA Q3 review."
        );
    }
}
