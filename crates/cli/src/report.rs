//! Exported record of a finished run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use pipeline::{ModelName, ResearchState, RunId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub run_id: RunId,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub model: ModelName,
    pub state: ResearchState,
}

/// Writes `report` to `path` as pretty-printed JSON.
pub fn write(path: &Path, report: &ResearchReport) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, report)
        .with_context(|| format!("writing report to {}", path.display()))?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
