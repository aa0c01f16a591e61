//! Core domain types, model gateway, and analysis pipeline for reviewing
//! presentation decks with a hosted language model.

pub mod context;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod prompts;
pub mod report;
pub mod session;
pub mod summarize;
pub mod types;

#[cfg(test)]
mod testing;

pub use context::{ContextFailure, ContextIdentifier, ContextOutcome};
pub use error::{Error, GatewayError, Result};
pub use extract::DeckExtractor;
pub use gateway::{ChatBackend, ChatRequest, Gateway, ImageBackend, RetryPolicy, Sleeper, TokioSleeper};
pub use report::ReportFormatter;
pub use session::{AnalysisSession, FileKey};
pub use summarize::DeckSummarizer;
pub use types::{
    AnalysisResult, ChatMessage, ChatRole, ContextField, DeckContext, Purpose, SlideInsight,
    SlideRecord, VisualConcept,
};
