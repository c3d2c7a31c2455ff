//! Gemini `generateContent` client: the production [`ImageTransformer`].
//!
//! Every operation is the same request shape: one or two inline images
//! followed by one instruction, with `responseModalities: ["IMAGE"]`. Only the
//! first part of the first candidate is inspected. When it carries
//! `inlineData` that is the result; anything else is a soft failure and the
//! call returns `Ok(None)`.
//!
//! Each call is sent exactly once; retrying is left to the caller.

use crate::artifact::ImageArtifact;
use crate::background::HexColor;
use crate::config::StudioConfig;
use crate::error::BgSwapError;
use crate::pipeline::encode::{from_inline_data, to_inline_part};
use crate::prompts::PromptSet;
use crate::transform::{ImageTransformer, Operation, TransformResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Env vars consulted, in order, when the config carries no key.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(data: InlineData) -> Self {
        Self {
            text: None,
            inline_data: Some(data),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

impl fmt::Debug for InlineData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineData")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

/// Build the request body: images in order, then the instruction.
pub fn build_request(images: &[&ImageArtifact], instruction: &str) -> GenerateContentRequest {
    let mut parts: Vec<Part> = images.iter().map(|img| to_inline_part(img)).collect();
    parts.push(Part::text(instruction));

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE".to_string()],
        },
    }
}

/// Pull the image out of the first candidate's first part, if there is one.
pub fn extract_image(response: &GenerateContentResponse, operation: Operation) -> Option<ImageArtifact> {
    let part = response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .first()?;

    let inline = match &part.inline_data {
        Some(inline) => inline,
        None => {
            if let Some(ref text) = part.text {
                debug!("{}: model answered with text instead of an image: {}", operation, text);
            }
            return None;
        }
    };

    match from_inline_data(inline) {
        Ok(image) if !image.is_empty() => Some(image),
        Ok(_) => {
            warn!("{}: model returned an empty image payload", operation);
            None
        }
        Err(e) => {
            warn!("{}: undecodable image payload: {}", operation, e);
            None
        }
    }
}

/// First non-empty key from the config, then the environment.
pub fn resolve_api_key(config: &StudioConfig) -> Result<String, BgSwapError> {
    if let Some(ref key) = config.api_key {
        if !key.trim().is_empty() {
            return Ok(key.clone());
        }
    }
    for var in API_KEY_ENV_VARS {
        if let Ok(key) = std::env::var(var) {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }
    }
    Err(BgSwapError::MissingApiKey {
        hint: "Set GEMINI_API_KEY (or pass --api-key) to use the Gemini image model.".to_string(),
    })
}

// ── Client ───────────────────────────────────────────────────────────────

/// Stateless client for one model endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    prompts: PromptSet,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client from the config, resolving the key from the
    /// environment when the config has none.
    pub fn from_config(config: &StudioConfig) -> Result<Self, BgSwapError> {
        let api_key = resolve_api_key(config)?;
        Self::new(api_key, config)
    }

    pub fn new(api_key: impl Into<String>, config: &StudioConfig) -> Result<Self, BgSwapError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| BgSwapError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint(),
            api_key: api_key.into(),
            prompts: config.prompts.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate(
        &self,
        operation: Operation,
        images: &[&ImageArtifact],
        instruction: &str,
    ) -> TransformResult {
        let body = build_request(images, instruction);
        let start = Instant::now();
        info!("{}: sending {} image(s) to the model", operation, images.len());

        let transport = |detail: String| BgSwapError::RemoteTransportFailure { operation, detail };

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    transport(format!("timed out after {}ms", start.elapsed().as_millis()))
                } else {
                    transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(300).collect();
            return Err(transport(format!("HTTP {status}: {snippet}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| transport(format!("invalid response body: {e}")))?;

        let image = extract_image(&parsed, operation);
        debug!(
            "{}: {} in {:?}",
            operation,
            if image.is_some() { "image received" } else { "no image" },
            start.elapsed()
        );
        Ok(image)
    }
}

#[async_trait]
impl ImageTransformer for GeminiClient {
    async fn remove_background(&self, subject: &ImageArtifact) -> TransformResult {
        self.generate(Operation::RemoveBackground, &[subject], &self.prompts.remove_background)
            .await
    }

    async fn cartoonify(&self, subject: &ImageArtifact) -> TransformResult {
        self.generate(Operation::Cartoonify, &[subject], &self.prompts.cartoonify)
            .await
    }

    async fn composite_onto_image(
        &self,
        subject: &ImageArtifact,
        background: &ImageArtifact,
    ) -> TransformResult {
        self.generate(
            Operation::CompositeOntoImage,
            &[subject, background],
            &self.prompts.composite_onto_image,
        )
        .await
    }

    async fn composite_onto_color(&self, subject: &ImageArtifact, color: &HexColor) -> TransformResult {
        let instruction = self.prompts.color_instruction(color);
        self.generate(Operation::CompositeOntoColor, &[subject], &instruction)
            .await
    }
}
