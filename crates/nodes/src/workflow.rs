//! The workflow driver: a fixed linear chain of [`Node`]s.
//!
//! ```text
//! extract_tools ──▶ research ──▶ analyze ──▶ (terminal)
//! ```
//!
//! Each node receives the accumulated [`ResearchState`] and returns a partial
//! [`StateUpdate`] that the driver merges before invoking the next node. There
//! are no branches, retries, or cycles.
//!
//! The progress sink is an argument of every run rather than state of the
//! [`Workflow`], so one instance can serve concurrent runs.

use std::sync::Arc;

use pipeline::{
    LlmProvider, NoopProgress, ProgressEvent, ProgressSink, ResearchState, RunId,
    SearchProvider, ToolScoutError,
};
use tracing::{info, info_span, warn, Instrument};

use crate::analyze::AnalyzeNode;
use crate::extract::ExtractToolsNode;
use crate::node::{Node, StageContext};
use crate::research::ResearchNode;

pub struct Workflow {
    search: Arc<dyn SearchProvider>,
    llm: Arc<dyn LlmProvider>,
    nodes: Vec<Box<dyn Node>>,
}

impl Workflow {
    /// Builds the standard three-stage workflow over the given providers.
    pub fn new(search: Arc<dyn SearchProvider>, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            search,
            llm,
            nodes: vec![
                Box::new(ExtractToolsNode),
                Box::new(ResearchNode),
                Box::new(AnalyzeNode),
            ],
        }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }

    /// Runs the workflow for `query` without progress reporting.
    ///
    /// # Errors
    ///
    /// See [`Workflow::run_with_progress`].
    pub async fn run(&self, query: &str) -> Result<ResearchState, ToolScoutError> {
        self.run_with_progress(query, &NoopProgress).await
    }

    /// Runs the workflow for `query`, reporting progress to `progress`.
    ///
    /// # Errors
    ///
    /// Only driver-level failures are returned (currently a blank query).
    /// Stage failures are reported as `error` events and degrade to defaults.
    pub async fn run_with_progress(
        &self,
        query: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ResearchState, ToolScoutError> {
        self.run_as(RunId::new_random(), query, progress).await
    }

    /// Like [`Workflow::run_with_progress`], under a caller-chosen run id.
    ///
    /// # Errors
    ///
    /// See [`Workflow::run_with_progress`].
    pub async fn run_as(
        &self,
        run_id: RunId,
        query: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ResearchState, ToolScoutError> {
        let span = info_span!("research_run", %run_id);
        self.drive(query, progress).instrument(span).await
    }

    async fn drive(
        &self,
        query: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ResearchState, ToolScoutError> {
        let mut state = match ResearchState::new(query) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "cannot start research run");
                progress.emit(&ProgressEvent::error(e.to_string()));
                return Err(e);
            }
        };

        info!(query = %state.query(), "research run started");
        let ctx = StageContext::new(self.search.as_ref(), self.llm.as_ref(), progress);
        for node in &self.nodes {
            let span = info_span!("stage", stage = node.name());
            let update = node.execute(&state, &ctx).instrument(span).await;
            state.merge(update);
        }

        info!(
            tools = state.extracted_tools.len(),
            companies = state.companies.len(),
            "research run finished"
        );
        progress.emit(&ProgressEvent::Final {
            final_state: state.clone(),
        });
        Ok(state)
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("stages", &self.stage_names())
            .finish_non_exhaustive()
    }
}
