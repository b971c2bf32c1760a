pub mod check;
pub mod criteria;
pub mod init;
pub mod score;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use learnmark_core::config::LearnmarkConfig;
use learnmark_core::engine::{EngineConfig, LearningEngine};
use learnmark_core::traits::FixedClock;

/// How a report is printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => anyhow::bail!("unknown format: {other} (expected text, json or markdown)"),
        }
    }
}

/// Engine pinned to the scenario's `as_of` instant when it has one.
pub fn engine_for(as_of: Option<DateTime<Utc>>, config: &LearnmarkConfig) -> LearningEngine {
    let engine_config = EngineConfig::from(config);
    match as_of {
        Some(instant) => LearningEngine::with_clock(Arc::new(FixedClock(instant)), engine_config),
        None => LearningEngine::new(engine_config),
    }
}

/// Where `--save` writes a report: `<output_dir>/<kind>-<name>-<timestamp>.json`.
pub fn saved_report_path(output_dir: &Path, kind: &str, name: &str) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    output_dir.join(format!("{kind}-{name}-{timestamp}.json"))
}
