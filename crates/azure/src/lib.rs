//! Azure OpenAI backend for the deck model gateway.
//!
//! Implements chat completion and image generation against one Azure
//! resource, configured from the environment.

pub mod client;
pub mod config;

pub use client::{AzureOpenAiClient, Deployment};
pub use config::AzureConfig;
