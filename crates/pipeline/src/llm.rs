//! Language-model port.
//!
//! The [`LlmProvider`] trait is the only view the stages have of the model.
//! Infrastructure crates (`llm`) implement it; tests substitute in-memory
//! fakes.
//!
//! Structured output is modelled as two explicit steps: the provider returns
//! a raw JSON value for a named [`OutputSchema`], then [`complete_as`]
//! deserialises it and runs [`StructuredOutput::validate`]. Either step can
//! fail with a typed [`LlmError`], which callers are expected to absorb.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{RetryPolicy, TokenUsage};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Author of a [`ChatMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    /// Instructions that frame the conversation.
    System,
    /// Input from the caller.
    User,
    /// A previous model turn.
    Assistant,
}

/// One role-tagged message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message.
    pub role: ChatRole,
    /// Plain-text body.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Free-text completion returned by [`LlmProvider::complete`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    /// Concatenated text of the model's answer.
    pub content: String,
    /// Tokens billed for the call.
    pub usage: TokenUsage,
}

// ---------------------------------------------------------------------------
// Structured output
// ---------------------------------------------------------------------------

/// A named JSON Schema describing the shape a structured completion must take.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    name: String,
    description: String,
    schema: serde_json::Value,
}

impl OutputSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The JSON Schema document (an `"type": "object"` schema).
    pub fn json_schema(&self) -> &serde_json::Value {
        &self.schema
    }
}

/// A field-level constraint that a deserialised structured output broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field `{field}` {reason}")]
pub struct SchemaViolation {
    pub field: String,
    pub reason: String,
}

impl SchemaViolation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A type that can be requested from the model in structured-output mode.
pub trait StructuredOutput: DeserializeOwned + Send {
    /// Schema sent to the provider.
    fn schema() -> OutputSchema;

    /// Checks invariants serde cannot express and normalises the value.
    fn validate(self) -> Result<Self, SchemaViolation>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by an [`LlmProvider`] or by structured-output parsing.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The request could not be sent or the connection failed mid-flight.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The provider answered with a non-success HTTP status.
    #[error("LLM provider returned HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<std::time::Duration>,
    },

    /// The provider response could not be decoded.
    #[error("LLM response malformed: {0}")]
    MalformedResponse(String),

    /// A structured completion did not match its schema.
    #[error("structured output `{schema}` invalid: {reason}")]
    Schema { schema: String, reason: String },
}

impl LlmError {
    /// Whether re-issuing the same request may succeed.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            LlmError::Transport(_) | LlmError::Timeout => RetryPolicy::Retryable { after: None },
            LlmError::Api {
                status,
                retry_after,
                ..
            } if *status == 429 || *status >= 500 => RetryPolicy::Retryable {
                after: *retry_after,
            },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// A chat-completion language model.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns a free-text completion for `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError>;

    /// Returns a JSON value the model produced for `schema`.
    ///
    /// Implementations only guarantee the value is a JSON object; use
    /// [`complete_as`] to obtain a validated typed record.
    async fn complete_structured(
        &self,
        messages: &[ChatMessage],
        schema: &OutputSchema,
    ) -> Result<serde_json::Value, LlmError>;
}

/// Requests `T` in structured-output mode, then deserialises and validates it.
///
/// # Errors
///
/// Propagates provider errors, and returns [`LlmError::Schema`] when the value
/// does not deserialise into `T` or fails [`StructuredOutput::validate`].
pub async fn complete_as<T: StructuredOutput>(
    provider: &dyn LlmProvider,
    messages: &[ChatMessage],
) -> Result<T, LlmError> {
    let schema = T::schema();
    let raw = provider.complete_structured(messages, &schema).await?;
    parse_structured(&schema, raw)
}

/// The parse-and-validate half of [`complete_as`].
pub fn parse_structured<T: StructuredOutput>(
    schema: &OutputSchema,
    raw: serde_json::Value,
) -> Result<T, LlmError> {
    let value: T = serde_json::from_value(raw).map_err(|e| LlmError::Schema {
        schema: schema.name().to_string(),
        reason: e.to_string(),
    })?;
    value.validate().map_err(|v| LlmError::Schema {
        schema: schema.name().to_string(),
        reason: v.to_string(),
    })
}
