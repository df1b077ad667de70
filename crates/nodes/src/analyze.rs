//! Stage 3: turn the researched records into a short recommendation.

use async_trait::async_trait;
use pipeline::{Company, ProgressEvent, ResearchState, StateUpdate};
use tracing::{info, warn};

use crate::node::{Node, StageContext, StageError};
use crate::prompts;

/// Value stored in `analysis` when the recommendation could not be produced.
pub const ANALYSIS_FAILED: &str = "Analysis failed";

#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyzeNode;

#[async_trait]
impl Node for AnalyzeNode {
    fn name(&self) -> &'static str {
        "analyze"
    }

    async fn execute(&self, state: &ResearchState, ctx: &StageContext<'_>) -> StateUpdate {
        ctx.emit(ProgressEvent::AnalysisStart {});

        match recommend(state, ctx).await {
            Ok(analysis) => {
                info!(chars = analysis.len(), "recommendation ready");
                ctx.emit(ProgressEvent::AnalysisDone {
                    analysis: analysis.clone(),
                });
                StateUpdate::analysis(analysis)
            }
            Err(e) => {
                warn!(error = %e, "recommendation failed");
                ctx.emit(ProgressEvent::error(format!("analysis failed: {e}")));
                StateUpdate::analysis(ANALYSIS_FAILED)
            }
        }
    }
}

async fn recommend(state: &ResearchState, ctx: &StageContext<'_>) -> Result<String, StageError> {
    let company_data = serialise_companies(&state.companies)?;
    let messages = prompts::recommendations_messages(state.query(), &company_data);
    let completion = ctx.llm.complete(&messages).await?;
    Ok(completion.content)
}

/// Serialises every record as JSON and joins them with `", "`.
pub fn serialise_companies(companies: &[Company]) -> Result<String, serde_json::Error> {
    let parts = companies
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join(", "))
}
