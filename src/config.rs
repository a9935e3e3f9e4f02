//! Service configuration.
//!
//! Everything the request handler needs (credential, model, limits, CORS
//! origins) lives in one [`ServiceConfig`] that is built once at startup and
//! shared read-only by every request. Nothing is read from process globals
//! while a request is in flight.
//!
//! Build it with [`ServiceConfig::builder()`]; [`ServiceConfigBuilder::build`]
//! validates the result.

use crate::error::MindMapError;
use std::fmt;

/// Default Gemini model. Must accept PDF input.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default base URL of the Generative Language REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Origins of the usual front-end dev servers (Vite and CRA).
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://localhost:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3000",
];

/// Configuration for the mind-map service.
///
/// # Example
/// ```rust
/// use pdf2mindmap::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .api_key("test-key")
///     .model("gemini-2.0-flash")
///     .request_timeout_secs(120)
///     .build()
///     .unwrap();
/// assert!(config.has_credential());
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// API key for the generative model. `None` disables generation (503).
    pub api_key: Option<String>,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the model API, without trailing slash.
    pub api_base_url: String,

    /// Timeout for the single model call, in seconds. Default: 600.
    ///
    /// Long documents can take minutes to analyse.
    pub request_timeout_secs: u64,

    /// Sampling temperature. `None` leaves the model default.
    pub temperature: Option<f32>,

    /// Custom instruction prompt. If None, uses
    /// [`crate::prompts::MINDMAP_GENERATION_PROMPT`].
    pub system_prompt: Option<String>,

    /// Largest accepted PDF in bytes. Default: 20 MiB. The request body may
    /// exceed this by the multipart framing allowance.
    pub max_upload_bytes: usize,

    /// Reject uploads whose bytes do not start with `%PDF`. Default: true.
    pub require_pdf_magic: bool,

    /// Browser origins allowed by CORS. Default: [`DEFAULT_ALLOWED_ORIGINS`].
    pub allowed_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 600,
            temperature: None,
            system_prompt: None,
            max_upload_bytes: 20 * 1024 * 1024,
            require_pdf_magic: true,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("temperature", &self.temperature)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("require_pdf_magic", &self.require_pdf_magic)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// True when an API key is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// The prompt to send: the override if set, else the built-in one.
    pub fn prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::MINDMAP_GENERATION_PROMPT)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// Set the API key. Blank keys count as absent.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.config.api_key = if key.trim().is_empty() {
            None
        } else {
            Some(key)
        };
        self
    }

    /// Set or clear the API key from an optional value (e.g. an env var).
    pub fn api_key_opt(mut self, key: Option<String>) -> Self {
        match key {
            Some(k) => self.api_key(k),
            None => {
                self.config.api_key = None;
                self
            }
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn require_pdf_magic(mut self, v: bool) -> Self {
        self.config.require_pdf_magic = v;
        self
    }

    /// Replace the CORS allow-list.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, MindMapError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(MindMapError::InvalidConfig("Model name must not be empty".into()));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(MindMapError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(MindMapError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(MindMapError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if let Some(bad) = c
            .allowed_origins
            .iter()
            .find(|o| !(o.starts_with("http://") || o.starts_with("https://")))
        {
            return Err(MindMapError::InvalidConfig(format!(
                "CORS origin must be http(s), got '{bad}'"
            )));
        }
        Ok(self.config)
    }
}
