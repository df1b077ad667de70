//! Progress events emitted while a run is in flight.
//!
//! Events are delivered synchronously, inline with the run, to the
//! [`ProgressSink`] passed to that run. A slow sink stalls the pipeline.
//!
//! Serialised, every event is a JSON object whose `phase` key names the
//! variant in `snake_case`, e.g.
//! `{"phase":"research_tool_start","tool":"Unleash"}`.

use serde::{Deserialize, Serialize};

use crate::{Company, ResearchState, ToolName};

/// One phase-tagged progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Article search for `query` is about to start.
    ExtractToolsStart { query: String },
    /// Candidate names parsed from the articles.
    ExtractedTools { tools: Vec<ToolName> },
    /// Nothing was extracted; tool names come from searching `query` directly.
    ResearchFallback { query: String },
    /// The tools about to be researched, at most four.
    ResearchStart { tools: Vec<ToolName> },
    /// Research of one tool is starting.
    ResearchToolStart { tool: ToolName },
    /// Emitted as soon as one tool's record is complete.
    CompanyReady { company: Company },
    /// Research finished with `count` records.
    ResearchDone { count: usize },
    /// The recommendation call is starting.
    AnalysisStart {},
    /// The recommendation text.
    AnalysisDone { analysis: String },
    /// Carries the terminal state; always the last event of a successful run.
    Final { final_state: ResearchState },
    /// A stage absorbed a failure. The stream continues after this.
    Error { error: String },
}

impl ProgressEvent {
    /// The `phase` tag this event serialises with.
    pub fn phase(&self) -> &'static str {
        match self {
            ProgressEvent::ExtractToolsStart { .. } => "extract_tools_start",
            ProgressEvent::ExtractedTools { .. } => "extracted_tools",
            ProgressEvent::ResearchFallback { .. } => "research_fallback",
            ProgressEvent::ResearchStart { .. } => "research_start",
            ProgressEvent::ResearchToolStart { .. } => "research_tool_start",
            ProgressEvent::CompanyReady { .. } => "company_ready",
            ProgressEvent::ResearchDone { .. } => "research_done",
            ProgressEvent::AnalysisStart {} => "analysis_start",
            ProgressEvent::AnalysisDone { .. } => "analysis_done",
            ProgressEvent::Final { .. } => "final",
            ProgressEvent::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            error: message.into(),
        }
    }
}

/// Receives progress events for one run.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: &ProgressEvent) {}
}
