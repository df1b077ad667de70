//! [`LlmProvider`] over the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{ChatMessage, Completion, LlmError, LlmProvider, OutputSchema, RetryPolicy, TokenUsage};
use tracing::{debug, warn};

use crate::config::AnthropicConfig;
use crate::wire::{
    split_messages, ErrorEnvelope, MessagesRequest, MessagesResponse, ToolChoice, ToolDefinition,
};

const API_VERSION: &str = "2023-06-01";

/// Longest back-off applied between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    /// Builds a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: reqwest::Client, config: AnthropicConfig) -> Self {
        Self { client, config }
    }

    /// Sends `request`, retrying retryable failures with exponential back-off.
    async fn send(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, LlmError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let RetryPolicy::Retryable { after } = e.retry_policy() else {
                        return Err(e);
                    };
                    if attempt >= self.config.max_retries {
                        return Err(e);
                    }
                    let delay = after.unwrap_or_else(|| self.backoff(attempt)).min(MAX_BACKOFF);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying Anthropic request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    async fn send_once(&self, request: &MessagesRequest<'_>) -> Result<MessagesResponse, LlmError> {
        let response = self
            .client
            .post(self.config.messages_endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|env| format!("{}: {}", env.error.kind, env.error.message))
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        let usage = TokenUsage::from(&parsed.usage);
        debug!(
            model = %self.config.model,
            input_tokens = usage.input.as_u64(),
            output_tokens = usage.output.as_u64(),
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
            "Anthropic call complete"
        );
        Ok(parsed)
    }

    fn request<'a>(&'a self, messages: &'a [ChatMessage]) -> MessagesRequest<'a> {
        let (system, messages) = split_messages(messages);
        MessagesRequest {
            model: self.config.model.as_str(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature.as_f64(),
            system,
            messages,
            tools: Vec::new(),
            tool_choice: None,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(e.to_string())
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
        let request = self.request(messages);
        let response = self.send(&request).await?;
        Ok(Completion {
            content: response.text(),
            usage: TokenUsage::from(&response.usage),
        })
    }

    /// Forces a single tool call whose input schema is `schema` and returns
    /// the tool input.
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, LlmError> {
        let mut request = self.request(messages);
        request.tools = vec![ToolDefinition {
            name: schema.name(),
            description: schema.description(),
            input_schema: schema.json_schema(),
        }];
        request.tool_choice = Some(ToolChoice {
            kind: "tool",
            name: schema.name(),
        });

        let response = self.send(&request).await?;
        let input = response.tool_input(schema.name()).ok_or_else(|| LlmError::Schema {
            schema: schema.name().to_string(),
            reason: "response contained no tool_use block".to_string(),
        })?;
        if !input.is_object() {
            return Err(LlmError::Schema {
                schema: schema.name().to_string(),
                reason: "tool input is not a JSON object".to_string(),
            });
        }
        Ok(input.clone())
    }
}
