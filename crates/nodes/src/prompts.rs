//! Prompt templates for the three LLM calls of a run.
//!
//! Every function here is pure: `(query, content) -> message text`.

use pipeline::ChatMessage;

/// Characters of a tool's page passed to the analysis prompt.
pub const ANALYSIS_CONTENT_CHARS: usize = 2500;

pub const TOOL_EXTRACTION_SYSTEM: &str = "\
You are a technology researcher. Extract the names of concrete tools, \
libraries, platforms, or services from articles. Only name products that a \
developer can adopt directly; ignore general concepts and feature names.";

pub const TOOL_ANALYSIS_SYSTEM: &str = "\
You analyse developer tools and programming technologies from the point of \
view of a working software engineer. Pay attention to supported languages, \
frameworks, APIs, SDKs, integrations, and pricing.";

pub const RECOMMENDATIONS_SYSTEM: &str = "\
You are a senior software engineer giving short, practical technology \
recommendations. Answer in three or four sentences at most.";

pub fn tool_extraction_user(query: &str, content: &str) -> String {
    format!(
        "Query: {query}\n\
         Article content:\n{content}\n\n\
         List the specific tool or service names in this content that are relevant to \"{query}\".\n\n\
         Rules:\n\
         - Product names only, no generic terms\n\
         - Include open source and commercial options\n\
         - At most the 5 most relevant tools\n\
         - One name per line, no numbering, no descriptions\n\n\
         Example:\n\
         Supabase\n\
         PlanetScale\n\
         Neon"
    )
}

pub fn tool_analysis_user(tool_name: &str, content: &str) -> String {
    let content = truncate_chars(content, ANALYSIS_CONTENT_CHARS);
    format!(
        "Tool: {tool_name}\n\
         Website content:\n{content}\n\n\
         From a developer's perspective, report:\n\
         - pricing_model: one of \"Free\", \"Freemium\", \"Paid\", \"Enterprise\", \"Unknown\"\n\
         - is_open_source: true, false, or null if unclear\n\
         - tech_stack: languages, frameworks, databases, or services it is built on or supports\n\
         - description: one sentence on what it does for developers\n\
         - api_available: true if a REST/GraphQL API, SDK, or other programmatic access is mentioned\n\
         - language_support: programming languages explicitly supported\n\
         - integration_capabilities: tools and platforms it integrates with (GitHub, Docker, AWS, ...)"
    )
}

pub fn recommendations_user(query: &str, company_data: &str) -> String {
    format!(
        "Developer query: {query}\n\
         Tools analysed: {company_data}\n\n\
         In three or four sentences, say which tool fits best and why, \
         the main pricing consideration, and its key technical advantage."
    )
}

/// System + user message pair for tool-name extraction.
pub fn tool_extraction_messages(query: &str, content: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(TOOL_EXTRACTION_SYSTEM),
        ChatMessage::user(tool_extraction_user(query, content)),
    ]
}

pub fn tool_analysis_messages(tool_name: &str, content: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(TOOL_ANALYSIS_SYSTEM),
        ChatMessage::user(tool_analysis_user(tool_name, content)),
    ]
}

pub fn recommendations_messages(query: &str, company_data: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(RECOMMENDATIONS_SYSTEM),
        ChatMessage::user(recommendations_user(query, company_data)),
    ]
}

/// Returns the longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
