//! Language-model gateway.
//!
//! A [`Gateway`] wraps a [`ChatBackend`] (one remote request per call) with a
//! bounded retry policy. Backends know nothing about retries; the gateway
//! knows nothing about HTTP. Image generation is an optional second backend.

use crate::error::GatewayError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Temperature used when a caller has no particular preference.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// A single (system, user) chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Sends one chat request to a remote model.
#[async_trait]
pub trait ChatBackend: Send + Sync + Debug {
    /// Perform exactly one remote request and return the generated text.
    async fn complete(&self, request: &ChatRequest) -> Result<String, GatewayError>;
}

/// Generates an image from a text prompt.
#[async_trait]
pub trait ImageBackend: Send + Sync + Debug {
    /// Perform exactly one remote request and return the image URL.
    async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Pause between attempts. Swapped out in tests so retries cost nothing.
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// How many times to try a remote call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }
}

/// Retrying front door to the remote model.
#[derive(Debug, Clone)]
pub struct Gateway {
    chat: Arc<dyn ChatBackend>,
    images: Option<Arc<dyn ImageBackend>>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Gateway {
    /// Create a gateway with the default retry policy and a tokio sleeper.
    pub fn new(chat: Arc<dyn ChatBackend>) -> Self {
        Self {
            chat,
            images: None,
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_image_backend(mut self, images: Arc<dyn ImageBackend>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn sleeper(&self) -> &Arc<dyn Sleeper> {
        &self.sleeper
    }

    pub fn has_image_backend(&self) -> bool {
        self.images.is_some()
    }

    /// Chat with the policy's attempt count.
    pub async fn chat(&self, system: &str, user: &str, temperature: f32) -> Result<String, GatewayError> {
        self.generate(system, user, temperature, self.policy.max_attempts)
            .await
    }

    /// Send a chat request, retrying up to `max_attempts` total attempts.
    ///
    /// The last failure is returned once attempts run out. Output is trimmed.
    pub async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_attempts: u32,
    ) -> Result<String, GatewayError> {
        let request = ChatRequest {
            system: system.to_string(),
            user: user.to_string(),
            temperature,
        };
        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.chat.complete(&request).await {
                Ok(text) => {
                    if attempt > 1 {
                        log::debug!("Chat request succeeded on attempt {}", attempt);
                    }
                    return Ok(text.trim().to_string());
                }
                Err(e) if attempt >= max_attempts => {
                    log::warn!("Chat request failed after {} attempts: {}", attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    log::warn!(
                        "Chat request failed on attempt {}/{}, retrying in {:?}: {}",
                        attempt,
                        max_attempts,
                        self.policy.backoff,
                        e
                    );
                    self.sleeper.sleep(self.policy.backoff).await;
                }
            }
        }
    }

    /// Ask the image backend for one image. No retries.
    pub async fn generate_image(&self, prompt: &str) -> Result<String, GatewayError> {
        let images = self
            .images
            .as_ref()
            .ok_or_else(|| GatewayError::Unavailable("no image deployment configured".into()))?;
        images.generate_image(prompt).await
    }
}
