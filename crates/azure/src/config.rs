//! Azure OpenAI connection settings.

use deck_core::{Error, Result};
use std::fmt;

pub const API_KEY_VAR: &str = "AZURE_OPENAI_API_KEY";
pub const ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const API_VERSION_VAR: &str = "AZURE_OPENAI_API_VERSION";
pub const CHAT_DEPLOYMENT_VAR: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const IMAGE_DEPLOYMENT_VAR: &str = "AZURE_OPENAI_IMAGE_DEPLOYMENT_NAME";
pub const DEBUG_MODE_VAR: &str = "DEBUG_MODE";

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_CHAT_DEPLOYMENT: &str = "gpt-4";

/// Everything needed to talk to one Azure OpenAI resource.
///
/// Built once at startup and handed to the client by reference.
#[derive(Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub api_key: String,
    pub endpoint: String,
    pub api_version: String,
    pub chat_deployment: String,
    /// Image model deployment; image generation is unavailable without it.
    pub image_deployment: Option<String>,
    pub debug: bool,
}

impl AzureConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = [API_KEY_VAR, ENDPOINT_VAR]
            .into_iter()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::ConfigError(format!(
                "Missing Azure credentials; set {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            api_key: get(API_KEY_VAR).unwrap_or_default(),
            endpoint: get(ENDPOINT_VAR).unwrap_or_default(),
            api_version: get(API_VERSION_VAR).unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            chat_deployment: get(CHAT_DEPLOYMENT_VAR)
                .unwrap_or_else(|| DEFAULT_CHAT_DEPLOYMENT.to_string()),
            image_deployment: get(IMAGE_DEPLOYMENT_VAR),
            debug: get(DEBUG_MODE_VAR).is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }

    /// Endpoint without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }

    pub fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.base_url(),
            self.chat_deployment,
            self.api_version
        )
    }

    pub fn image_url(&self) -> Option<String> {
        self.image_deployment.as_ref().map(|deployment| {
            format!(
                "{}/openai/deployments/{}/images/generations?api-version={}",
                self.base_url(),
                deployment,
                self.api_version
            )
        })
    }

    pub fn deployments_url(&self) -> String {
        format!(
            "{}/openai/deployments?api-version={}",
            self.base_url(),
            self.api_version
        )
    }
}

impl fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("chat_deployment", &self.chat_deployment)
            .field("image_deployment", &self.image_deployment)
            .field("debug", &self.debug)
            .finish()
    }
}
