//! Plain-text analysis report.
//!
//! Renders the deck context, executive summary, and one section per slide,
//! with sections separated by a blank line.

use crate::types::{AnalysisResult, DeckContext, SlideRecord, VisualConcept, UNKNOWN};

/// Formatter for the terminal report.
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    /// Include each slide's raw extracted text.
    include_raw_text: bool,
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw_text(mut self, include: bool) -> Self {
        self.include_raw_text = include;
        self
    }

    /// Format a full analysis.
    ///
    /// # Example output
    /// ```text
    /// Topic:   Q3 Review
    /// Region:  Not specified
    /// Purpose: Report
    ///
    /// Executive summary
    /// A quarterly review.
    ///
    /// Slide 1
    ///   Summary: Revenue is up
    ///   Design:  Bold headline
    ///   Layout:  Two columns
    ///   Chart:   Bar chart
    /// ```
    pub fn format(&self, slides: &[SlideRecord], analysis: &AnalysisResult) -> String {
        let mut sections = vec![
            self.format_context(&analysis.context),
            format!("Executive summary\n{}", analysis.deck_summary),
        ];

        for (slide, insight) in slides.iter().zip(&analysis.per_slide) {
            let mut section = format!(
                "Slide {}\n  Summary: {}\n  Design:  {}\n  Layout:  {}\n  Chart:   {}",
                slide.slide_number,
                indent_continuation(&insight.summary),
                indent_continuation(&insight.design_note),
                indent_continuation(&insight.layout_suggestion),
                indent_continuation(&insight.chart_suggestion),
            );
            if slide.has_notes {
                section.push_str("\n  Notes:   ");
                section.push_str(&indent_continuation(&slide.notes_text));
            }
            if self.include_raw_text {
                section.push_str("\n  Text:    ");
                section.push_str(&indent_continuation(&slide.slide_text));
            }
            sections.push(section);
        }

        format!("{}\n", sections.join("\n\n"))
    }

    pub fn format_context(&self, context: &DeckContext) -> String {
        let region = if context.region == UNKNOWN {
            "Not specified"
        } else {
            context.region.as_str()
        };
        format!(
            "Topic:   {}\nRegion:  {}\nPurpose: {}",
            context.topic,
            region,
            capitalize(context.purpose.as_str())
        )
    }

    /// Format extracted slides without any analysis.
    pub fn format_slides(&self, slides: &[SlideRecord]) -> String {
        if slides.is_empty() {
            return String::new();
        }
        let sections: Vec<String> = slides
            .iter()
            .map(|slide| {
                let mut section = format!(
                    "Slide {}\n  Text:    {}",
                    slide.slide_number,
                    indent_continuation(&slide.slide_text)
                );
                if slide.has_notes {
                    section.push_str("\n  Notes:   ");
                    section.push_str(&indent_continuation(&slide.notes_text));
                }
                section
            })
            .collect();
        format!("{}\n", sections.join("\n\n"))
    }

    pub fn format_visual(&self, slide_number: usize, visual: &VisualConcept) -> String {
        let mut out = format!(
            "Visual concept for slide {}\n  Prompt:  {}",
            slide_number,
            indent_continuation(&visual.prompt)
        );
        match (&visual.image_url, &visual.image_error) {
            (Some(url), _) => {
                out.push_str("\n  Image:   ");
                out.push_str(url);
            }
            (None, Some(err)) => {
                out.push_str("\n  Image:   not generated (");
                out.push_str(err);
                out.push(')');
            }
            (None, None) => {}
        }
        out.push('\n');
        out
    }
}

/// Align continuation lines under the value column.
fn indent_continuation(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\n           ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
