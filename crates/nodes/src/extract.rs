//! Stage 1: discover candidate tool names for the query.

use async_trait::async_trait;
use pipeline::{ProgressEvent, ResearchState, StateUpdate, ToolName};
use tracing::{debug, info, warn};

use crate::node::{Node, StageContext, StageError};
use crate::prompts;

/// Articles searched for candidate names.
pub const ARTICLE_SEARCH_LIMIT: usize = 3;

/// Characters of each article passed to the extraction prompt.
pub const ARTICLE_PREFIX_CHARS: usize = 1500;

/// Searches comparison articles for the query and asks the model to list the
/// tools they mention.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractToolsNode;

#[async_trait]
impl Node for ExtractToolsNode {
    fn name(&self) -> &'static str {
        "extract_tools"
    }

    async fn execute(&self, state: &ResearchState, ctx: &StageContext<'_>) -> StateUpdate {
        ctx.emit(ProgressEvent::ExtractToolsStart {
            query: state.query().to_string(),
        });

        let tools = match extract_tools(state.query(), ctx).await {
            Ok(tools) => tools,
            Err(e) => {
                warn!(error = %e, "tool extraction failed");
                ctx.emit(ProgressEvent::error(format!("extract_tools failed: {e}")));
                return StateUpdate::extracted_tools(Vec::new());
            }
        };

        info!(count = tools.len(), "extracted candidate tools");
        ctx.emit(ProgressEvent::ExtractedTools {
            tools: tools.clone(),
        });
        StateUpdate::extracted_tools(tools)
    }
}

async fn extract_tools(query: &str, ctx: &StageContext<'_>) -> Result<Vec<ToolName>, StageError> {
    let article_query = format!("{query} tools comparison best alternatives");
    let results = ctx.search.search(&article_query, ARTICLE_SEARCH_LIMIT).await?;

    let mut content = String::new();
    for hit in results.data.iter().take(ARTICLE_SEARCH_LIMIT) {
        match ctx.search.scrape(&hit.url).await {
            Ok(page) => {
                if let Some(markdown) = page.content() {
                    content.push_str(prompts::truncate_chars(markdown, ARTICLE_PREFIX_CHARS));
                    content.push_str("\n\n");
                }
            }
            Err(e) => debug!(url = %hit.url, error = %e, "skipping unreadable article"),
        }
    }

    // Without article text the model can only guess.
    if content.is_empty() {
        debug!(%article_query, "no article content found");
        return Ok(Vec::new());
    }

    let messages = prompts::tool_extraction_messages(query, &content);
    let completion = ctx.llm.complete(&messages).await?;
    Ok(parse_tool_names(&completion.content))
}

/// Splits a newline-delimited model answer into tool names.
pub fn parse_tool_names(text: &str) -> Vec<ToolName> {
    text.trim().lines().filter_map(ToolName::new).collect()
}
