//! Interactive analysis session.
//!
//! Holds everything derived from the currently loaded file: slides, the
//! memoized analysis, generated visuals, and the question transcript. Opening
//! a different file throws all of it away.

use crate::error::{Error, Result};
use crate::extract::DeckExtractor;
use crate::summarize::DeckSummarizer;
use crate::types::{
    AnalysisResult, ChatMessage, ContextField, SlideRecord, VisualConcept,
};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Identity of an uploaded file: its name plus an MD5 digest of its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileKey {
    pub name: String,
    pub digest: String,
}

impl FileKey {
    pub fn new(name: impl Into<String>, data: &[u8]) -> Self {
        Self {
            name: name.into(),
            digest: format!("{:x}", md5::compute(data)),
        }
    }
}

#[derive(Debug, Default)]
pub struct AnalysisSession {
    file: Option<FileKey>,
    slides: Vec<SlideRecord>,
    analysis: Option<AnalysisResult>,
    visuals: BTreeMap<usize, VisualConcept>,
    transcript: Vec<ChatMessage>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file, reusing current state when it is the same file.
    ///
    /// A different file clears the analysis, visuals, and transcript before
    /// extraction. If extraction fails the session is left empty.
    pub fn open_file(
        &mut self,
        name: &str,
        data: &[u8],
        extractor: &dyn DeckExtractor,
    ) -> Result<&[SlideRecord]> {
        let key = FileKey::new(name, data);
        if self.file.as_ref() == Some(&key) {
            log::debug!("'{}' unchanged; keeping session state", name);
            return Ok(&self.slides);
        }

        if self.file.is_some() {
            log::info!("New file '{}'; clearing session state", name);
        }
        self.clear();
        self.slides = extractor.extract(data)?;
        self.file = Some(key);
        Ok(&self.slides)
    }

    /// Drop all session state.
    pub fn clear(&mut self) {
        self.file = None;
        self.slides.clear();
        self.analysis = None;
        self.visuals.clear();
        self.transcript.clear();
    }

    pub fn file(&self) -> Option<&FileKey> {
        self.file.as_ref()
    }

    pub fn slides(&self) -> &[SlideRecord] {
        &self.slides
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn visual(&self, index: usize) -> Option<&VisualConcept> {
        self.visuals.get(&index)
    }

    pub fn visuals(&self) -> &BTreeMap<usize, VisualConcept> {
        &self.visuals
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Return the stored analysis, computing it on first use.
    pub async fn analyze(&mut self, summarizer: &DeckSummarizer) -> Result<&AnalysisResult> {
        if self.file.is_none() {
            return Err(Error::NoDeckLoaded);
        }
        if self.analysis.is_none() {
            let result = summarizer.summarize(&self.slides).await?;
            self.analysis = Some(result);
        } else {
            log::debug!("Reusing stored analysis");
        }
        self.analysis.as_ref().ok_or(Error::AnalysisRequired)
    }

    /// Discard the stored analysis (and visuals built on it) and recompute.
    pub async fn reanalyze(&mut self, summarizer: &DeckSummarizer) -> Result<&AnalysisResult> {
        self.analysis = None;
        self.visuals.clear();
        self.analyze(summarizer).await
    }

    /// Fill an "Unknown" context field on the stored analysis.
    pub fn fill_context(&mut self, field: ContextField, value: &str) -> Result<bool> {
        let analysis = self.analysis.as_mut().ok_or(Error::AnalysisRequired)?;
        Ok(analysis.context.fill_unknown(field, value))
    }

    /// Generate a visual concept for the slide at `index` (0-based).
    ///
    /// Prompt generation failures propagate. Image failures are kept on the
    /// concept instead, with the prompt still available.
    pub async fn generate_visual(
        &mut self,
        index: usize,
        summarizer: &DeckSummarizer,
    ) -> Result<&VisualConcept> {
        let analysis = self.analysis.as_ref().ok_or(Error::AnalysisRequired)?;
        let insight = analysis
            .per_slide
            .get(index)
            .ok_or(Error::SlideOutOfRange {
                slide: index + 1,
                count: analysis.per_slide.len(),
            })?;

        let prompt = summarizer
            .image_prompt(&insight.summary, &insight.design_note, &analysis.context)
            .await?;

        let concept = match summarizer.gateway().generate_image(&prompt).await {
            Ok(url) => VisualConcept {
                prompt,
                image_url: Some(url),
                image_error: None,
            },
            Err(e) => {
                log::warn!("Image generation failed for slide {}: {}", index + 1, e);
                VisualConcept {
                    prompt,
                    image_url: None,
                    image_error: Some(e.to_string()),
                }
            }
        };

        let stored: &VisualConcept = match self.visuals.entry(index) {
            Entry::Occupied(mut entry) => {
                entry.insert(concept);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(concept),
        };
        Ok(stored)
    }

    /// Ask a question about the analysed deck and record both turns.
    ///
    /// The question is recorded before the model call, so a failed call
    /// leaves it in the transcript without an answer.
    pub async fn ask(&mut self, question: &str, summarizer: &DeckSummarizer) -> Result<String> {
        let deck_summary = self
            .analysis
            .as_ref()
            .ok_or(Error::AnalysisRequired)?
            .deck_summary
            .clone();

        self.transcript.push(ChatMessage::user(question));
        let answer = summarizer.answer_question(question, &deck_summary).await?;
        self.transcript.push(ChatMessage::assistant(answer.clone()));
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::Gateway;
    use crate::testing::{LineExtractor, RecordingSleeper, ScriptedBackend, ScriptedImages};
    use crate::types::{ChatRole, UNKNOWN};
    use std::sync::Arc;

    const DECK_A: &[u8] = b"Title: Q3 Review\nAgenda: Intro, Results\nNext steps";
    const DECK_B: &[u8] = b"Hiring plan\nBudget";

    fn scripted() -> ScriptedBackend {
        let backend = ScriptedBackend::new();
        backend.on(
            "presentation metadata",
            r#"{"topic": "Q3 Review", "region": "", "purpose": "review"}"#,
        );
        backend.on("busy executive", "A quarterly review.");
        backend.on("Key point", "1. Point\n2. Tip");
        backend.on("slide layout", "Layout");
        backend.on("chart type", "Chart");
        backend.on("image prompt", "A skyline at dawn");
        backend.on("Answer questions", "Three slides.");
        backend
    }

    fn summarizer(backend: &ScriptedBackend, images: Option<ScriptedImages>) -> DeckSummarizer {
        let mut gateway = Gateway::new(Arc::new(backend.clone()))
            .with_sleeper(Arc::new(RecordingSleeper::default()));
        if let Some(images) = images {
            gateway = gateway.with_image_backend(Arc::new(images));
        }
        DeckSummarizer::new(gateway)
    }

    #[tokio::test]
    async fn test_analyze_is_memoized() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let extractor = LineExtractor::default();
        let mut session = AnalysisSession::new();

        session.open_file("a.pptx", DECK_A, &extractor).unwrap();
        session.analyze(&s).await.unwrap();
        let first_run = backend.call_count();
        assert_eq!(first_run, 2 + 3 * 3);

        let again = session.analyze(&s).await.unwrap().clone();
        assert_eq!(backend.call_count(), first_run);
        assert_eq!(again.per_slide.len(), 3);

        // Re-opening the same bytes keeps the analysis and skips extraction.
        session.open_file("a.pptx", DECK_A, &extractor).unwrap();
        session.analyze(&s).await.unwrap();
        assert_eq!(backend.call_count(), first_run);
        assert_eq!(extractor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reanalyze_recomputes() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();

        session.analyze(&s).await.unwrap();
        let first_run = backend.call_count();
        session.reanalyze(&s).await.unwrap();
        assert_eq!(backend.call_count(), first_run * 2);
    }

    #[tokio::test]
    async fn test_new_file_invalidates_state() {
        let backend = scripted();
        let s = summarizer(&backend, Some(ScriptedImages::ok("https://img/1.png")));
        let extractor = LineExtractor::default();
        let mut session = AnalysisSession::new();

        session.open_file("a.pptx", DECK_A, &extractor).unwrap();
        session.analyze(&s).await.unwrap();
        session.generate_visual(0, &s).await.unwrap();
        session.ask("How many slides?", &s).await.unwrap();
        assert!(session.visual(0).is_some());
        assert_eq!(session.transcript().len(), 2);

        let slides = session.open_file("b.pptx", DECK_B, &extractor).unwrap();
        assert_eq!(slides.len(), 2);
        assert!(session.analysis().is_none());
        assert!(session.visuals().is_empty());
        assert!(session.transcript().is_empty());
        assert_eq!(session.file().unwrap().name, "b.pptx");
    }

    #[tokio::test]
    async fn test_same_name_different_content_is_new_file() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let extractor = LineExtractor::default();
        let mut session = AnalysisSession::new();

        session.open_file("deck.pptx", DECK_A, &extractor).unwrap();
        session.analyze(&s).await.unwrap();
        session.open_file("deck.pptx", DECK_B, &extractor).unwrap();

        assert!(session.analysis().is_none());
        assert_eq!(extractor.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_extraction_leaves_session_empty() {
        let mut session = AnalysisSession::new();
        let extractor = LineExtractor::default();
        session.open_file("a.pptx", DECK_A, &extractor).unwrap();

        let err = session
            .open_file("bad.pptx", &[0xff, 0xfe, 0x00], &extractor)
            .unwrap_err();
        assert!(err.is_parse_error());
        assert!(session.file().is_none());
        assert!(session.slides().is_empty());
    }

    #[tokio::test]
    async fn test_failed_analysis_stores_nothing() {
        let backend = ScriptedBackend::new();
        backend.fail_on("presentation metadata", GatewayError::Request("offline".into()));
        let s = summarizer(&backend, None);
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();

        assert!(session.analyze(&s).await.is_err());
        assert!(session.analysis().is_none());
    }

    #[tokio::test]
    async fn test_analyze_without_file() {
        let backend = scripted();
        let mut session = AnalysisSession::new();
        let err = session.analyze(&summarizer(&backend, None)).await.unwrap_err();
        assert!(matches!(err, Error::NoDeckLoaded));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_visual_degrades_when_image_fails() {
        let backend = scripted();
        let images = ScriptedImages::failing(GatewayError::Api {
            status: 400,
            body: "content policy".into(),
        });
        let s = summarizer(&backend, Some(images.clone()));
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();
        session.analyze(&s).await.unwrap();

        let concept = session.generate_visual(1, &s).await.unwrap();
        assert_eq!(concept.prompt, "A skyline at dawn");
        assert!(concept.image_url.is_none());
        assert!(concept.image_error.as_deref().unwrap().contains("content policy"));
        assert_eq!(images.prompts(), vec!["A skyline at dawn".to_string()]);
    }

    #[tokio::test]
    async fn test_visual_without_image_backend_keeps_prompt() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();
        session.analyze(&s).await.unwrap();

        let concept = session.generate_visual(0, &s).await.unwrap();
        assert_eq!(concept.prompt, "A skyline at dawn");
        assert!(concept.image_url.is_none());
    }

    #[tokio::test]
    async fn test_visual_rejects_out_of_range_slide() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();
        session.analyze(&s).await.unwrap();

        let err = session.generate_visual(3, &s).await.unwrap_err();
        assert!(matches!(err, Error::SlideOutOfRange { slide: 4, count: 3 }));
        assert_eq!(err.to_string(), "Slide 4 does not exist (deck has 3 slides)");
    }

    #[tokio::test]
    async fn test_visual_regenerates_in_place() {
        let backend = scripted();
        let images = ScriptedImages::ok("https://img/1.png");
        let s = summarizer(&backend, Some(images.clone()));
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();
        session.analyze(&s).await.unwrap();

        session.generate_visual(2, &s).await.unwrap();
        let concept = session.generate_visual(2, &s).await.unwrap();
        assert_eq!(concept.image_url.as_deref(), Some("https://img/1.png"));

        assert_eq!(session.visuals().len(), 1);
        assert_eq!(images.prompts().len(), 2);
        assert!(session.visual(2).is_some());
    }

    #[tokio::test]
    async fn test_ask_records_transcript() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();

        assert!(matches!(
            session.ask("Too early?", &s).await,
            Err(Error::AnalysisRequired)
        ));
        assert!(session.transcript().is_empty());

        session.analyze(&s).await.unwrap();
        let answer = session.ask("How many slides?", &s).await.unwrap();
        assert_eq!(answer, "Three slides.");

        let transcript = session.transcript();
        assert_eq!(transcript[0].role, ChatRole::User);
        assert_eq!(transcript[0].content, "How many slides?");
        assert_eq!(transcript[1].role, ChatRole::Assistant);

        let last = backend.calls().pop().unwrap();
        assert!(last.user.ends_with("Presentation Content:\nA quarterly review."));
    }

    #[tokio::test]
    async fn test_failed_question_stays_unanswered() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();
        session.analyze(&s).await.unwrap();

        backend.push_err(GatewayError::Request("reset".into()));
        backend.push_err(GatewayError::Request("reset".into()));
        let err = session.ask("Still there?", &s).await.unwrap_err();
        assert!(matches!(err, Error::GatewayError(GatewayError::Request(_))));

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, ChatRole::User);
        assert_eq!(transcript[0].content, "Still there?");
    }

    #[tokio::test]
    async fn test_fill_context_on_unknown_region() {
        let backend = scripted();
        let s = summarizer(&backend, None);
        let mut session = AnalysisSession::new();
        session
            .open_file("a.pptx", DECK_A, &LineExtractor::default())
            .unwrap();
        session.analyze(&s).await.unwrap();
        assert_eq!(session.analysis().unwrap().context.region, UNKNOWN);

        assert!(session.fill_context(ContextField::Region, "Nordics").unwrap());
        assert!(!session.fill_context(ContextField::Topic, "Other").unwrap());

        let ctx = &session.analysis().unwrap().context;
        assert_eq!(ctx.region, "Nordics");
        assert_eq!(ctx.topic, "Q3 Review");
    }
}
