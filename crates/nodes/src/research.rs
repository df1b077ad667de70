//! Stage 2: research each candidate tool and build its [`Company`] record.
//!
//! Tools are processed one at a time, in order, and each finished record is
//! emitted as `company_ready` before the next tool starts. A tool whose
//! "official site" search finds nothing is skipped without a record.

use async_trait::async_trait;
use pipeline::{
    complete_as, Company, CompanyAnalysis, ProgressEvent, ResearchState, StateUpdate, ToolName,
};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::node::{Node, StageContext, StageError};
use crate::prompts;

/// Upper bound on tools researched per run.
pub const MAX_TOOLS: usize = 4;

#[derive(Debug, Default, Clone, Copy)]
pub struct ResearchNode;

#[async_trait]
impl Node for ResearchNode {
    fn name(&self) -> &'static str {
        "research"
    }

    async fn execute(&self, state: &ResearchState, ctx: &StageContext<'_>) -> StateUpdate {
        match research(state, ctx).await {
            Ok(companies) => StateUpdate::companies(companies),
            Err(e) => {
                warn!(error = %e, "research stage failed");
                ctx.emit(ProgressEvent::error(format!("research failed: {e}")));
                StateUpdate::companies(Vec::new())
            }
        }
    }
}

async fn research(state: &ResearchState, ctx: &StageContext<'_>) -> Result<Vec<Company>, StageError> {
    let tool_names = if state.extracted_tools.is_empty() {
        ctx.emit(ProgressEvent::ResearchFallback {
            query: state.query().to_string(),
        });
        let results = ctx.search.search(state.query(), MAX_TOOLS).await?;
        results
            .data
            .iter()
            .take(MAX_TOOLS)
            .map(|hit| hit.title().and_then(ToolName::new).unwrap_or_else(ToolName::unknown))
            .collect::<Vec<_>>()
    } else {
        state.extracted_tools.iter().take(MAX_TOOLS).cloned().collect()
    };

    ctx.emit(ProgressEvent::ResearchStart {
        tools: tool_names.clone(),
    });

    let mut companies = Vec::with_capacity(tool_names.len());
    for tool in &tool_names {
        let span = info_span!("research_tool", tool = %tool);
        if let Some(company) = research_tool(tool, ctx).instrument(span).await {
            companies.push(company.clone());
            ctx.emit(ProgressEvent::CompanyReady { company });
        }
    }

    info!(count = companies.len(), attempted = tool_names.len(), "research complete");
    ctx.emit(ProgressEvent::ResearchDone {
        count: companies.len(),
    });
    Ok(companies)
}

/// Builds the record for one tool, or `None` when the tool has no search hit.
async fn research_tool(tool: &ToolName, ctx: &StageContext<'_>) -> Option<Company> {
    ctx.emit(ProgressEvent::ResearchToolStart { tool: tool.clone() });

    let query = format!("{tool} official site");
    let results = match ctx.search.search(&query, 1).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = %e, "official site search failed; skipping tool");
            return None;
        }
    };
    let Some(hit) = results.first() else {
        debug!("no search results; skipping tool");
        return None;
    };

    let placeholder = hit
        .markdown
        .clone()
        .or_else(|| hit.description.clone())
        .unwrap_or_default();
    let mut company = Company::seed(tool, placeholder, hit.url.clone());

    let analysis = match ctx.search.scrape(&hit.url).await {
        Ok(page) => match page.content() {
            Some(content) => analyze_content(tool, content, ctx).await,
            None => {
                warn!(url = %hit.url, "scraped page was empty");
                CompanyAnalysis::failed()
            }
        },
        Err(e) => {
            warn!(url = %hit.url, error = %e, "scrape failed");
            CompanyAnalysis::failed()
        }
    };
    company.apply_analysis(analysis);
    Some(company)
}

/// Runs the structured analysis for one tool's page content.
///
/// Never fails: any provider or schema error yields
/// [`CompanyAnalysis::failed`].
pub async fn analyze_content(
    tool: &ToolName,
    content: &str,
    ctx: &StageContext<'_>,
) -> CompanyAnalysis {
    let messages = prompts::tool_analysis_messages(tool.as_str(), content);
    match complete_as::<CompanyAnalysis>(ctx.llm, &messages).await {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "company analysis failed; using sentinel");
            CompanyAnalysis::failed()
        }
    }
}
