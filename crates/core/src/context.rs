//! Deck context identification.
//!
//! Asks the model for `{topic, region, purpose}` as JSON and validates the
//! answer. Unparseable answers are retried a few times; if every attempt is
//! unusable the outcome is [`ContextOutcome::Degraded`] with the all-"Unknown"
//! context, so callers always have something to render.

use crate::error::Result;
use crate::gateway::Gateway;
use crate::prompts::{context_user_prompt, CONTEXT_SYSTEM_PROMPT};
use crate::types::{DeckContext, Purpose, SlideRecord, UNKNOWN};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

/// Full identify attempts before degrading.
pub const CONTEXT_ATTEMPTS: u32 = 3;

/// Pause between identify attempts.
pub const CONTEXT_RETRY_PAUSE: Duration = Duration::from_secs(1);

pub const CONTEXT_TEMPERATURE: f32 = 0.2;

/// Matches a response wrapped in a markdown code fence.
static CODE_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").unwrap());

/// Why a model answer could not be used as a context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextFailure {
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("field `{0}` is missing or not a string")]
    InvalidField(&'static str),
}

/// Result of context identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextOutcome {
    /// The model produced a usable answer (fields may still be "Unknown").
    Identified(DeckContext),

    /// No attempt produced a usable answer.
    Degraded {
        attempts: u32,
        last_failure: ContextFailure,
    },
}

impl ContextOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ContextOutcome::Degraded { .. })
    }

    /// The context to use downstream.
    pub fn into_context(self) -> DeckContext {
        match self {
            ContextOutcome::Identified(ctx) => ctx,
            ContextOutcome::Degraded { .. } => DeckContext::unknown(),
        }
    }
}

/// Validate a raw model answer into a [`DeckContext`].
///
/// Blank topic or region become "Unknown"; a purpose outside the allowed
/// vocabulary becomes [`Purpose::Unknown`].
pub fn parse_context_response(raw: &str) -> std::result::Result<DeckContext, ContextFailure> {
    let raw = raw.trim();
    let body = CODE_FENCE_REGEX
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    let value: Value =
        serde_json::from_str(body).map_err(|e| ContextFailure::NotJson(e.to_string()))?;
    let object = value.as_object().ok_or(ContextFailure::NotAnObject)?;

    let field = |name: &'static str| -> std::result::Result<String, ContextFailure> {
        object
            .get(name)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .ok_or(ContextFailure::InvalidField(name))
    };
    let or_unknown = |s: String| if s.is_empty() { UNKNOWN.to_string() } else { s };

    Ok(DeckContext {
        topic: or_unknown(field("topic")?),
        region: or_unknown(field("region")?),
        purpose: Purpose::from_label(&field("purpose")?),
    })
}

/// Runs the identify step against a gateway.
#[derive(Debug, Clone)]
pub struct ContextIdentifier {
    gateway: Gateway,
    attempts: u32,
    pause: Duration,
}

impl ContextIdentifier {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            attempts: CONTEXT_ATTEMPTS,
            pause: CONTEXT_RETRY_PAUSE,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Identify the deck's context.
    ///
    /// Gateway failures propagate; invalid answers do not.
    pub async fn identify(&self, slides: &[SlideRecord]) -> Result<ContextOutcome> {
        let user = context_user_prompt(slides);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let raw = self
                .gateway
                .chat(CONTEXT_SYSTEM_PROMPT, &user, CONTEXT_TEMPERATURE)
                .await?;

            match parse_context_response(&raw) {
                Ok(ctx) => {
                    log::debug!(
                        "Identified context: topic={:?} region={:?} purpose={}",
                        ctx.topic,
                        ctx.region,
                        ctx.purpose
                    );
                    return Ok(ContextOutcome::Identified(ctx));
                }
                Err(failure) if attempt >= self.attempts => {
                    log::warn!(
                        "Context identification gave up after {} attempts: {}",
                        attempt,
                        failure
                    );
                    return Ok(ContextOutcome::Degraded {
                        attempts: attempt,
                        last_failure: failure,
                    });
                }
                Err(failure) => {
                    log::debug!("Context attempt {} unusable: {}", attempt, failure);
                    self.gateway.sleeper().sleep(self.pause).await;
                }
            }
        }
    }
}
