//! Deck summarization and per-slide design suggestions.

use crate::context::{ContextIdentifier, ContextOutcome};
use crate::error::Result;
use crate::gateway::{Gateway, DEFAULT_TEMPERATURE};
use crate::prompts::{
    deck_user_prompt, image_user_prompt, question_user_prompt, CHART_SYSTEM_PROMPT,
    DECK_SUMMARY_SYSTEM_PROMPT, IMAGE_PROMPT_SYSTEM_PROMPT, KEY_POINT_SYSTEM_PROMPT,
    LAYOUT_SYSTEM_PROMPT, QUESTION_SYSTEM_PROMPT,
};
use crate::types::{AnalysisResult, DeckContext, SlideInsight, SlideRecord};

/// Marker separating the key point from the design tip in model answers.
pub const DESIGN_TIP_MARKER: &str = "2.";

/// Shown when a key-point answer has no design tip part.
pub const MISSING_DESIGN_TIP: &str = "—";

pub const SUGGESTION_TEMPERATURE: f32 = 0.4;
pub const IMAGE_PROMPT_TEMPERATURE: f32 = 0.7;

/// Split a "1. key point 2. design tip" answer.
///
/// Splits on every "2." and keeps the first two pieces, so a literal "2."
/// inside the key point (e.g. "grew 12.5%") cuts it short.
pub fn split_key_point(response: &str) -> (String, String) {
    let mut parts = response.split(DESIGN_TIP_MARKER);
    let key_point = parts
        .next()
        .unwrap_or_default()
        .replace("1.", "")
        .trim()
        .to_string();
    let design_tip = parts
        .next()
        .map(|tip| tip.trim().to_string())
        .unwrap_or_else(|| MISSING_DESIGN_TIP.to_string());
    (key_point, design_tip)
}

/// Orchestrates every model call needed to analyse a deck.
///
/// Calls are issued one at a time, in slide order.
#[derive(Debug, Clone)]
pub struct DeckSummarizer {
    gateway: Gateway,
    identifier: ContextIdentifier,
}

impl DeckSummarizer {
    pub fn new(gateway: Gateway) -> Self {
        let identifier = ContextIdentifier::new(gateway.clone());
        Self {
            gateway,
            identifier,
        }
    }

    pub fn with_identifier(mut self, identifier: ContextIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub async fn identify_context(&self, slides: &[SlideRecord]) -> Result<ContextOutcome> {
        self.identifier.identify(slides).await
    }

    /// Analyse a deck: context, executive summary, then per-slide insights.
    ///
    /// Issues `2 + 3 * slides.len()` chat requests when context succeeds on
    /// the first try. Any gateway failure aborts the whole analysis.
    pub async fn summarize(&self, slides: &[SlideRecord]) -> Result<AnalysisResult> {
        log::info!("Analyzing deck with {} slides", slides.len());

        let outcome = self.identify_context(slides).await?;
        if let ContextOutcome::Degraded { last_failure, .. } = &outcome {
            log::warn!("Using unknown context: {}", last_failure);
        }
        let context = outcome.into_context();

        let deck_summary = self
            .gateway
            .chat(
                DECK_SUMMARY_SYSTEM_PROMPT,
                &deck_user_prompt(slides),
                DEFAULT_TEMPERATURE,
            )
            .await?;

        let mut per_slide = Vec::with_capacity(slides.len());
        for slide in slides {
            log::debug!("Analyzing slide {}", slide.slide_number);
            per_slide.push(self.analyze_slide(slide).await?);
        }

        Ok(AnalysisResult {
            deck_summary,
            context,
            per_slide,
        })
    }

    /// Key point, design tip, layout, and chart suggestion for one slide.
    pub async fn analyze_slide(&self, slide: &SlideRecord) -> Result<SlideInsight> {
        let content = slide.prompt_content();

        let response = self
            .gateway
            .chat(KEY_POINT_SYSTEM_PROMPT, &content, DEFAULT_TEMPERATURE)
            .await?;
        let (summary, design_note) = split_key_point(&response);

        Ok(SlideInsight {
            summary,
            design_note,
            layout_suggestion: self.suggest_layout(&content).await?,
            chart_suggestion: self.suggest_chart(&content).await?,
        })
    }

    pub async fn suggest_layout(&self, slide_content: &str) -> Result<String> {
        Ok(self
            .gateway
            .chat(LAYOUT_SYSTEM_PROMPT, slide_content, SUGGESTION_TEMPERATURE)
            .await?)
    }

    pub async fn suggest_chart(&self, slide_content: &str) -> Result<String> {
        Ok(self
            .gateway
            .chat(CHART_SYSTEM_PROMPT, slide_content, SUGGESTION_TEMPERATURE)
            .await?)
    }

    /// Ask the model for an image prompt describing a visual for a slide.
    pub async fn image_prompt(
        &self,
        summary: &str,
        design_tip: &str,
        context: &DeckContext,
    ) -> Result<String> {
        Ok(self
            .gateway
            .chat(
                IMAGE_PROMPT_SYSTEM_PROMPT,
                &image_user_prompt(summary, design_tip, context),
                IMAGE_PROMPT_TEMPERATURE,
            )
            .await?)
    }

    /// Answer a free-form question using the deck summary as context.
    pub async fn answer_question(&self, question: &str, deck_summary: &str) -> Result<String> {
        Ok(self
            .gateway
            .chat(
                QUESTION_SYSTEM_PROMPT,
                &question_user_prompt(question, deck_summary),
                DEFAULT_TEMPERATURE,
            )
            .await?)
    }
}
