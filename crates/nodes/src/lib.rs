//! toolscout pipeline stages, prompt templates, and the workflow driver.
//!
//! This crate provides the three stage implementations (tool extraction,
//! per-tool research, recommendation) and the [`Workflow`] that runs them as a
//! linear chain.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Nodes sequence calls between the domain types in
//! the [`pipeline`] crate and the provider ports (search, LLM). They contain no
//! transport details of their own.

pub mod analyze;
pub mod extract;
pub mod node;
pub mod prompts;
pub mod research;
pub mod workflow;

pub use analyze::{AnalyzeNode, ANALYSIS_FAILED};
pub use extract::ExtractToolsNode;
pub use node::{Node, StageContext, StageError};
pub use research::{ResearchNode, MAX_TOOLS};
pub use workflow::Workflow;
