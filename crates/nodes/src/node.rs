//! The [`Node`] trait every stage implements, and the context it runs with.

use async_trait::async_trait;
use pipeline::{
    LlmError, LlmProvider, ProgressEvent, ProgressSink, ResearchState, SearchError,
    SearchProvider, StateUpdate,
};
use thiserror::Error;

/// Collaborators available to a stage for the duration of one run.
///
/// The progress sink is scoped to the run; nothing here outlives it.
pub struct StageContext<'a> {
    pub search: &'a dyn SearchProvider,
    pub llm: &'a dyn LlmProvider,
    progress: &'a dyn ProgressSink,
}

impl<'a> StageContext<'a> {
    pub fn new(
        search: &'a dyn SearchProvider,
        llm: &'a dyn LlmProvider,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            search,
            llm,
            progress,
        }
    }

    /// Delivers `event` to the run's sink, inline.
    pub fn emit(&self, event: ProgressEvent) {
        self.progress.emit(&event);
    }
}

/// One step of the linear research workflow.
///
/// A node never fails: external-service errors are converted into an `error`
/// progress event and a safe default inside the returned update.
#[async_trait]
pub trait Node: Send + Sync {
    /// Stable identifier used in spans and logs.
    fn name(&self) -> &'static str;

    async fn execute(&self, state: &ResearchState, ctx: &StageContext<'_>) -> StateUpdate;
}

/// Failures a stage absorbs before returning its default update.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("failed to serialise company record: {0}")]
    Serialise(#[from] serde_json::Error),
}
