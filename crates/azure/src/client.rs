use crate::config::AzureConfig;
use async_trait::async_trait;
use deck_core::{ChatBackend, ChatRequest, Error, GatewayError, ImageBackend, Result};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "api-key";
const IMAGE_SIZE: &str = "1024x1024";

// --- Chat completion request and response structures ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: [ChatCompletionMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionChoice {
    message: ChatCompletionReply,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionReply {
    content: Option<String>,
}

// --- Image generation ---

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize, Debug)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    url: Option<String>,
}

// --- Deployment listing ---

#[derive(Deserialize, Debug)]
struct DeploymentList {
    #[serde(default)]
    data: Vec<Deployment>,
}

/// A model deployment on the Azure resource.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
}

/// Chat and image backend for one Azure OpenAI resource.
#[derive(Clone, Debug)]
pub struct AzureOpenAiClient {
    client: ReqwestClient,
    config: AzureConfig,
}

impl AzureOpenAiClient {
    /// Creates a new client. Uses the HTTP client's default timeouts.
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// List deployments on the resource; doubles as a connection check.
    pub async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        let request = self
            .client
            .get(self.config.deployments_url())
            .header(API_KEY_HEADER, &self.config.api_key);

        let response = send(request).await?;
        let list: DeploymentList = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        log::debug!("Endpoint lists {} deployments", list.data.len());
        Ok(list.data)
    }
}

/// Send a request, turning transport failures and non-2xx statuses into
/// gateway errors.
async fn send(request: RequestBuilder) -> std::result::Result<Response, GatewayError> {
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

#[async_trait]
impl ChatBackend for AzureOpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> std::result::Result<String, GatewayError> {
        let body = ChatCompletionRequest {
            messages: [
                ChatCompletionMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatCompletionMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        log::debug!(
            "POST chat completion to '{}' ({} chars of user content)",
            self.config.chat_deployment,
            request.user.len()
        );

        let response = send(
            self.client
                .post(self.config.chat_url())
                .header(API_KEY_HEADER, &self.config.api_key)
                .json(&body),
        )
        .await?;

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GatewayError::EmptyResponse)
    }
}

#[async_trait]
impl ImageBackend for AzureOpenAiClient {
    async fn generate_image(&self, prompt: &str) -> std::result::Result<String, GatewayError> {
        let url = self
            .config
            .image_url()
            .ok_or_else(|| GatewayError::Unavailable("no image deployment configured".into()))?;

        let body = ImageRequest {
            prompt,
            n: 1,
            size: IMAGE_SIZE,
        };

        let response = send(
            self.client
                .post(url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .json(&body),
        )
        .await?;

        let images: ImageResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        images
            .data
            .into_iter()
            .find_map(|image| image.url)
            .ok_or(GatewayError::EmptyResponse)
    }
}
