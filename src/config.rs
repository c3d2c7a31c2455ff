//! Configuration for the image model client and the editing session.
//!
//! All behaviour is controlled through [`StudioConfig`], built via its
//! [`StudioConfigBuilder`]. The API key is an explicit field rather than
//! ambient process state, so tests can swap in a fake
//! [`ImageTransformer`] without touching the environment.

use crate::error::BgSwapError;
use crate::pipeline::input::ImageFetcher;
use crate::progress::ProgressCallback;
use crate::prompts::PromptSet;
use crate::transform::ImageTransformer;
use std::fmt;
use std::sync::Arc;

/// Image-editing model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Gemini REST root; `/models/{model}:generateContent` is appended.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a [`crate::session::Studio`] and its model client.
///
/// # Example
/// ```rust
/// use edgequake_bgswap::StudioConfig;
///
/// let config = StudioConfig::builder()
///     .api_key("test-key")
///     .model("gemini-2.5-flash-image")
///     .download_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.download_timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct StudioConfig {
    /// Gemini API key. If None, resolved from `GEMINI_API_KEY` / `API_KEY`.
    pub api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// REST endpoint root. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Per-model-call timeout in seconds. Default: None (wait indefinitely).
    ///
    /// Image edits routinely take 10–30 s; a request that never resolves
    /// keeps the session loading until this fires.
    pub api_timeout_secs: Option<u64>,

    /// Timeout for downloading background and input images. Default: 120.
    pub download_timeout_secs: u64,

    /// Instructions sent with each operation.
    pub prompts: PromptSet,

    /// Pre-constructed transformer. Takes precedence over `api_key`.
    pub transformer: Option<Arc<dyn ImageTransformer>>,

    /// Pre-constructed fetcher for preset and remote images.
    pub fetcher: Option<Arc<dyn ImageFetcher>>,

    /// Receives status updates as actions progress.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_timeout_secs: None,
            download_timeout_secs: 120,
            prompts: PromptSet::default(),
            transformer: None,
            fetcher: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudioConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("transformer", &self.transformer.as_ref().map(|_| "<dyn ImageTransformer>"))
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<dyn ImageFetcher>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn StudioProgressCallback>"),
            )
            .finish()
    }
}

impl StudioConfig {
    /// Create a new builder for `StudioConfig`.
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder {
            config: Self::default(),
        }
    }

    /// `{base_url}/models/{model}:generateContent`
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Builder for [`StudioConfig`].
#[derive(Debug)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn prompts(mut self, prompts: PromptSet) -> Self {
        self.config.prompts = prompts;
        self
    }

    pub fn transformer(mut self, transformer: Arc<dyn ImageTransformer>) -> Self {
        self.config.transformer = Some(transformer);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudioConfig, BgSwapError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(BgSwapError::InvalidConfig("model must not be empty".into()));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(BgSwapError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        if c.api_timeout_secs == Some(0) || c.download_timeout_secs == 0 {
            return Err(BgSwapError::InvalidConfig("timeouts must be ≥ 1 second".into()));
        }
        if !c.prompts.composite_onto_color.contains("{color}") {
            return Err(BgSwapError::InvalidConfig(
                "colour prompt must contain the {color} placeholder".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = StudioConfig::default();
        assert_eq!(c.model, "gemini-2.5-flash-image");
        assert_eq!(c.api_timeout_secs, None);
        assert_eq!(c.download_timeout_secs, 120);
        assert_eq!(
            c.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let c = StudioConfig::builder()
            .base_url("http://127.0.0.1:8080/v1beta/")
            .model("m")
            .build()
            .unwrap();
        assert_eq!(c.endpoint(), "http://127.0.0.1:8080/v1beta/models/m:generateContent");
    }

    #[test]
    fn build_rejects_bad_values() {
        assert!(StudioConfig::builder().model(" ").build().is_err());
        assert!(StudioConfig::builder().base_url("ftp://x").build().is_err());
        assert!(StudioConfig::builder().api_timeout_secs(0).build().is_err());
        let prompts = PromptSet {
            composite_onto_color: "solid background please".into(),
            ..PromptSet::default()
        };
        assert!(StudioConfig::builder().prompts(prompts).build().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = StudioConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
