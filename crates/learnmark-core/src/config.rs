//! Configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::RoundingMode;

/// Environment variable that overrides [`LearnmarkConfig::rounding`].
pub const ROUNDING_ENV_VAR: &str = "LEARNMARK_ROUNDING";

/// Top-level learnmark configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnmarkConfig {
    /// Rounding applied to partial-credit scores.
    #[serde(default)]
    pub rounding: RoundingMode,
    /// Where reports are written when no explicit output is given.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./learnmark-reports")
}

impl Default for LearnmarkConfig {
    fn default() -> Self {
        Self {
            rounding: RoundingMode::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Load configuration from `learnmark.toml` in the current directory.
pub fn load_config() -> Result<LearnmarkConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or fall back to `./learnmark.toml`,
/// or to defaults when neither exists.
///
/// `LEARNMARK_ROUNDING` overrides the rounding mode from the file.
pub fn load_config_from(path: Option<&Path>) -> Result<LearnmarkConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("learnmark.toml");
            local.exists().then_some(local)
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LearnmarkConfig::default(),
    };

    apply_rounding_override(&mut config, std::env::var(ROUNDING_ENV_VAR).ok())?;
    Ok(config)
}

/// Parse a config document.
pub fn parse_config(content: &str) -> Result<LearnmarkConfig> {
    Ok(toml::from_str(content)?)
}

fn apply_rounding_override(config: &mut LearnmarkConfig, value: Option<String>) -> Result<()> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(());
    };
    config.rounding = value
        .parse::<RoundingMode>()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("invalid {ROUNDING_ENV_VAR}"))?;
    Ok(())
}
