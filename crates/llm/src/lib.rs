//! toolscout LLM provider infrastructure adapter.
//!
//! Implements the [`pipeline::LlmProvider`] trait for Anthropic's Messages
//! API. Additional providers are added as new modules in this crate without
//! any changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** All HTTP transport, request formatting, response
//! parsing, and exponential back-off live here. The [`pipeline`] crate sees
//! only [`pipeline::LlmProvider`].
//!
//! ## Structured output
//!
//! Anthropic has no dedicated JSON mode, so structured completions are
//! requested as a single forced tool call whose `input_schema` is the target
//! schema. The tool input is returned verbatim; validation happens in
//! [`pipeline::complete_as`].

pub mod anthropic;
pub mod config;
mod wire;

pub use anthropic::AnthropicProvider;
pub use config::{AnthropicConfig, DEFAULT_MODEL, SUPPORTED_MODELS};
