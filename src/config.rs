//! Resizer configuration.
//!
//! Handles loading and validating an optional TOML file given with
//! `--config`. Without one, stock defaults apply. Command-line flags are
//! applied on top afterwards (see `main.rs`).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [tools]
//! exiftool = "exiftool"     # Metadata export/import
//! ffmpeg = "ffmpeg"         # Resizing
//! imagemagick = "magick"    # PNG/HEIC/WEBP → JPEG normalization
//! timeout_secs = 600        # Per-invocation limit; a hung tool fails its file
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! keep_temporaries = false  # Keep working copies and .xml sidecars
//! ```
//!
//! Tool entries may be bare program names (looked up on `PATH`) or full
//! paths. They are handed to the backend when it is constructed; nothing is
//! set process-wide.
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizerConfig {
    /// External program locations and limits.
    pub tools: ToolsConfig,
    /// Parallelism and temporary-file handling.
    pub processing: ProcessingConfig,
}

impl ResizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("tools.exiftool", &self.tools.exiftool),
            ("tools.ffmpeg", &self.tools.ffmpeg),
            ("tools.imagemagick", &self.tools.imagemagick),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if self.tools.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tools.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// External tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub exiftool: String,
    pub ffmpeg: String,
    /// ImageMagick 7 `magick`, or `convert` for ImageMagick 6.
    pub imagemagick: String,
    /// Seconds before a running tool is killed and its file marked failed.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            exiftool: "exiftool".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            imagemagick: "magick".to_string(),
            timeout_secs: 600,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Leave working copies and sidecars on disk after each file.
    pub keep_temporaries: bool,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<ResizerConfig, ConfigError> {
    let config: ResizerConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or stock defaults when no path is given.
///
/// A path that is given but missing is an error.
pub fn load_config(path: Option<&Path>) -> Result<ResizerConfig, ConfigError> {
    match path {
        Some(path) => parse_config(&fs::read_to_string(path)?),
        None => Ok(ResizerConfig::default()),
    }
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Printed by `resize --print-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# img-resizer configuration
# =========================
# Pass with: resize --config resizer.toml <length> <input> <output>
# All options are optional. Unknown keys are rejected.

[tools]
# Metadata export (-X) and re-import (-tagsfromfile).
exiftool = "exiftool"
# Performs the actual resize.
ffmpeg = "ffmpeg"
# Transcodes PNG/HEIC/WEBP to JPEG before resizing.
# Use "convert" with ImageMagick 6.
imagemagick = "magick"
# A tool still running after this many seconds is killed and its file
# counted as failed.
timeout_secs = 600

[processing]
# Maximum parallel workers. Omit for one per CPU core.
# max_processes = 4

# Keep the .xml metadata sidecars and JPEG working copies that are normally
# deleted after each file. Also enabled by -verbose.
keep_temporaries = false
"##
}
