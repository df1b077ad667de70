//! Anthropic provider configuration.

use std::time::Duration;

use pipeline::{ModelName, Temperature, ToolScoutError};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Models offered for selection.
pub const SUPPORTED_MODELS: &[&str] = &[
    "claude-opus-4-1-20250805",
    "claude-opus-4-20250514",
    "claude-sonnet-4-20250514",
    "claude-3-5-haiku-20241022",
    "claude-3-haiku-20240307",
];

#[derive(Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: ModelName,
    pub temperature: Temperature,
    pub max_tokens: u32,
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Extra attempts after the first for retryable failures.
    pub max_retries: u32,
    /// First back-off delay; doubles on every retry.
    pub retry_base_delay: Duration,
}

impl AnthropicConfig {
    /// Builds a configuration with defaults for everything but the key.
    ///
    /// # Errors
    ///
    /// Returns [`ToolScoutError::ConfigurationError`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ToolScoutError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(ToolScoutError::config("Anthropic API key is empty"));
        }
        let model = ModelName::new(DEFAULT_MODEL)
            .ok_or_else(|| ToolScoutError::config("default model name is empty"))?;
        Ok(Self {
            api_key,
            model,
            temperature: Temperature::default(),
            max_tokens: 1024,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        })
    }

    /// Selects the model.
    ///
    /// # Errors
    ///
    /// Rejects blank names and names outside [`SUPPORTED_MODELS`].
    pub fn with_model(mut self, model: &str) -> Result<Self, ToolScoutError> {
        let model = model.trim();
        if !SUPPORTED_MODELS.contains(&model) {
            return Err(ToolScoutError::config(format!(
                "unsupported model `{model}`; expected one of {}",
                SUPPORTED_MODELS.join(", ")
            )));
        }
        self.model = ModelName::new(model)
            .ok_or_else(|| ToolScoutError::config("model name is empty"))?;
        Ok(self)
    }

    /// # Errors
    ///
    /// Rejects values outside `[0.0, 1.0]`.
    pub fn with_temperature(mut self, temperature: f64) -> Result<Self, ToolScoutError> {
        self.temperature = Temperature::new(temperature).ok_or_else(|| {
            ToolScoutError::config(format!("temperature {temperature} is outside [0.0, 1.0]"))
        })?;
        Ok(self)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens.max(1);
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub(crate) fn messages_endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

// The key never appears in logs.
impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
