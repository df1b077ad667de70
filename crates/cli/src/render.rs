//! Progress sinks that print the event stream on stdout.

use std::io::Write;

use clap::ValueEnum;
use pipeline::{Company, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventFormat {
    /// Human-readable progress lines and company cards.
    Text,
    /// One JSON object per event.
    Json,
}

pub fn sink(format: EventFormat) -> Box<dyn ProgressSink> {
    match format {
        EventFormat::Text => Box::new(TextRenderer),
        EventFormat::Json => Box::new(JsonLines),
    }
}

pub struct TextRenderer;

impl ProgressSink for TextRenderer {
    fn emit(&self, event: &ProgressEvent) {
        if let Some(text) = format_event(event) {
            write_stdout(&text);
        }
    }
}

pub struct JsonLines;

impl ProgressSink for JsonLines {
    fn emit(&self, event: &ProgressEvent) {
        match serde_json::to_string(event) {
            Ok(line) => write_stdout(&line),
            Err(e) => tracing::warn!(error = %e, phase = event.phase(), "cannot encode event"),
        }
    }
}

fn write_stdout(text: &str) {
    let mut out = std::io::stdout().lock();
    if let Err(e) = writeln!(out, "{text}").and_then(|()| out.flush()) {
        tracing::warn!(error = %e, "cannot write progress to stdout");
    }
}

/// Renders one event as text, or `None` for events with nothing to show.
pub fn format_event(event: &ProgressEvent) -> Option<String> {
    let text = match event {
        ProgressEvent::ExtractToolsStart { query } => format!("Searching articles for: {query}"),
        ProgressEvent::ExtractedTools { tools } => {
            format!("Extracted candidate tools: {}", join(tools.iter().map(|t| t.as_str())))
        }
        ProgressEvent::ResearchFallback { query } => {
            format!("No tools extracted; searching directly for: {query}")
        }
        ProgressEvent::ResearchStart { tools } => {
            format!("Starting research of {} tools", tools.len())
        }
        ProgressEvent::ResearchToolStart { tool } => format!("Researching tool: {tool}"),
        ProgressEvent::CompanyReady { company } => format_company(company),
        ProgressEvent::ResearchDone { count } => format!("Researched {count} tools"),
        ProgressEvent::AnalysisStart {} => "Generating recommendations...".to_string(),
        ProgressEvent::AnalysisDone { analysis } => format!("\nRecommendations:\n\n{analysis}\n"),
        ProgressEvent::Final { .. } => return None,
        ProgressEvent::Error { error } => format!("Error: {error}"),
    };
    Some(text)
}

/// A multi-line card for one company record.
pub fn format_company(company: &Company) -> String {
    let mut lines = vec![format!("\n== {} ==", company.name)];

    let mut meta: Vec<&str> = Vec::new();
    if !company.website.is_empty() {
        meta.push(&company.website);
    }
    if let Some(pricing) = company.pricing_model.as_deref() {
        meta.push(pricing);
    }
    match company.is_open_source {
        Some(true) => meta.push("Open source"),
        Some(false) => meta.push("Proprietary"),
        None => {}
    }
    if !meta.is_empty() {
        lines.push(meta.join(" • "));
    }

    if !company.description.is_empty() {
        lines.push(company.description.clone());
    }
    if !company.tech_stack.is_empty() {
        lines.push(format!("Tech stack: {}", join(company.tech_stack.iter().take(12))));
    }

    let api = match company.api_available {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    };
    lines.push(format!("API: {api}"));

    if !company.language_support.is_empty() {
        lines.push(format!("Languages: {}", join(company.language_support.iter().take(6))));
    }
    if !company.integration_capabilities.is_empty() {
        lines.push(format!(
            "Integrations: {}",
            join(company.integration_capabilities.iter().take(6))
        ));
    }
    lines.join("\n")
}

fn join<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
