//! In-memory doubles for gateway-driven tests.

use crate::error::{Error, GatewayError};
use crate::extract::DeckExtractor;
use crate::gateway::{ChatBackend, ChatRequest, ImageBackend, Sleeper};
use crate::types::SlideRecord;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Chat backend that replays queued results, then falls back to rules keyed
/// on a substring of the system prompt. Every request is recorded.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    queue: Arc<Mutex<VecDeque<Result<String, GatewayError>>>>,
    rules: Arc<Mutex<Vec<(String, Result<String, GatewayError>)>>>,
    calls: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, text: &str) {
        self.queue.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn push_err(&self, err: GatewayError) {
        self.queue.lock().unwrap().push_back(Err(err));
    }

    /// Answer any request whose system prompt contains `key`.
    pub fn on(&self, key: &str, text: &str) {
        self.rules
            .lock()
            .unwrap()
            .push((key.to_string(), Ok(text.to_string())));
    }

    /// Fail any request whose system prompt contains `key`.
    pub fn fail_on(&self, key: &str, err: GatewayError) {
        self.rules.lock().unwrap().push((key.to_string(), Err(err)));
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String, GatewayError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next;
        }
        self.rules
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| request.system.contains(key.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| Err(GatewayError::Unavailable("no scripted response".into())))
    }
}

/// Image backend with a single fixed outcome.
#[derive(Clone, Debug)]
pub struct ScriptedImages {
    result: Result<String, GatewayError>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedImages {
    pub fn ok(url: &str) -> Self {
        Self {
            result: Ok(url.to_string()),
            prompts: Arc::default(),
        }
    }

    pub fn failing(err: GatewayError) -> Self {
        Self {
            result: Err(err),
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageBackend for ScriptedImages {
    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.result.clone()
    }
}

/// Sleeper that records requested pauses and returns immediately.
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

/// Extractor that treats each line of UTF-8 input as one slide's text.
/// Input that is not UTF-8 is rejected as corrupted.
#[derive(Debug, Default)]
pub struct LineExtractor {
    calls: AtomicUsize,
}

impl LineExtractor {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeckExtractor for LineExtractor {
    fn extract(&self, data: &[u8]) -> crate::Result<Vec<SlideRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::CorruptedFile(e.to_string()))?;
        Ok(text
            .lines()
            .enumerate()
            .map(|(i, line)| SlideRecord::new(i + 1, line, ""))
            .collect())
    }
}
