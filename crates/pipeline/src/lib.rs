//! Core research domain for toolscout.
//!
//! This crate contains the research state, the company and analysis records,
//! the progress event contract, and the port traits the stages call through.
//! Infrastructure crates implement the traits defined here; they never add
//! domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RunId`, `ToolName`, etc.) |
//! | [`types`] | Shared value types (`TokenCount`, `Temperature`, `Timestamp`) |
//! | [`errors`] | Run-level error and retry-policy types |
//! | [`state`] | `ResearchState`, `Company`, `CompanyAnalysis` |
//! | [`events`] | `ProgressEvent` and the `ProgressSink` port |
//! | [`search`] | `SearchProvider` port and its data model |
//! | [`llm`] | `LlmProvider` port and structured-output parsing |

pub mod errors;
pub mod events;
pub mod identifiers;
pub mod llm;
pub mod search;
pub mod state;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{RetryPolicy, ToolScoutError};
pub use events::{NoopProgress, ProgressEvent, ProgressSink};
pub use identifiers::{ModelName, RunId, ToolName};
pub use llm::{
    complete_as, parse_structured, ChatMessage, ChatRole, Completion, LlmError, LlmProvider,
    OutputSchema, SchemaViolation, StructuredOutput,
};
pub use search::{HitMetadata, ScrapedPage, SearchError, SearchHit, SearchProvider, SearchResults};
pub use state::{Company, CompanyAnalysis, ResearchState, StateUpdate};
pub use types::{Temperature, Timestamp, TokenCount, TokenUsage};
