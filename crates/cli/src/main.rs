//! toolscout CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration**: flags with environment fallbacks
//!    (`ANTHROPIC_API_KEY`, `FIRECRAWL_API_KEY`, `LLM_MODEL`, `LLM_TEMP`, ...).
//! 2. **Wire observability**: `tracing-subscriber` on stderr, plus an
//!    OpenTelemetry OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
//! 3. **Construct infrastructure**: `FirecrawlClient` and `AnthropicProvider`,
//!    injected into the `Workflow`.
//! 4. **Run and render**: stream progress events to stdout as text or JSON
//!    lines, and optionally export the terminal state as a JSON report.

mod render;
mod report;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context};
use clap::Parser;
use llm::{AnthropicConfig, AnthropicProvider};
use nodes::Workflow;
use pipeline::{RunId, Timestamp};
use search::{FirecrawlClient, FirecrawlConfig};
use tracing::info;

use crate::render::EventFormat;
use crate::report::ResearchReport;
use crate::telemetry::LogFormat;

/// Research developer tools for a query and recommend one.
#[derive(Debug, Parser)]
#[command(name = "toolscout", version, about)]
struct Cli {
    /// What to research, e.g. "open source feature flags for microservices".
    query: String,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: String,

    #[arg(long, env = "FIRECRAWL_API_KEY", hide_env_values = true)]
    firecrawl_api_key: String,

    /// Anthropic model used for every LLM call.
    #[arg(long, env = "LLM_MODEL", default_value = llm::DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature in [0.0, 1.0].
    #[arg(long, env = "LLM_TEMP", default_value_t = 0.1)]
    temperature: f64,

    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,

    /// Retries for rate-limited or failed LLM calls.
    #[arg(long, default_value_t = 2)]
    llm_max_retries: u32,

    /// Per-request HTTP timeout for both providers.
    #[arg(long, default_value_t = 60)]
    http_timeout_secs: u64,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = llm::config::DEFAULT_BASE_URL)]
    anthropic_base_url: String,

    #[arg(long, env = "FIRECRAWL_BASE_URL", default_value = search::DEFAULT_BASE_URL)]
    firecrawl_base_url: String,

    /// How progress events are printed on stdout.
    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    events: EventFormat,

    /// Log line format on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Write the final state as a JSON report to this file.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.log_format)?;
    let result = run(cli).await;
    telemetry.shutdown();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    ensure!(!cli.query.trim().is_empty(), "please enter a search query");

    let timeout = Duration::from_secs(cli.http_timeout_secs);
    let llm_config = AnthropicConfig::new(cli.anthropic_api_key)?
        .with_model(&cli.model)?
        .with_temperature(cli.temperature)?
        .with_max_tokens(cli.max_tokens)
        .with_max_retries(cli.llm_max_retries)
        .with_base_url(cli.anthropic_base_url)
        .with_timeout(timeout);
    let model = llm_config.model.clone();
    let llm = AnthropicProvider::new(llm_config).context("building Anthropic client")?;

    let search_config = FirecrawlConfig::new(cli.firecrawl_api_key)?
        .with_base_url(cli.firecrawl_base_url)
        .with_timeout(timeout);
    let search = FirecrawlClient::new(search_config).context("building Firecrawl client")?;

    let workflow = Workflow::new(Arc::new(search), Arc::new(llm));
    let sink = render::sink(cli.events);

    let run_id = RunId::new_random();
    let started_at = Timestamp::now();
    let clock = Instant::now();
    info!(%run_id, %model, query = %cli.query, "starting research");

    let state = workflow.run_as(run_id, &cli.query, sink.as_ref()).await?;
    let elapsed = clock.elapsed();

    if let Some(path) = &cli.output {
        let report = ResearchReport {
            run_id,
            started_at,
            finished_at: Timestamp::now(),
            model,
            state,
        };
        report::write(path, &report)?;
        info!(path = %path.display(), "report written");
    }

    if cli.events == EventFormat::Text {
        println!("Research completed in {:.1} seconds", elapsed.as_secs_f64());
    }
    info!(elapsed_ms = elapsed.as_millis() as u64, "research finished");
    Ok(())
}
