//! Production backend: shells out to the external tools.
//!
//! ## Tool mapping
//!
//! | Operation | Command line |
//! |---|---|
//! | Export metadata | `exiftool -X <source>` (stdout captured) |
//! | Import metadata | `exiftool -overwrite_original -tagsfromfile <sidecar> <target>` |
//! | Convert | `magick <source> -quality <q> <output>` |
//! | Resize | `ffmpeg -i <source> -movflags use_metadata_tags -map_metadata 0 -vf <scale> <output>` |
//!
//! Program locations come from [`ToolsConfig`] and are fixed at construction,
//! so parallel workers never share mutable tool state. Every invocation runs
//! in the directory of the file it writes (or reads, for export).

use super::backend::{BackendError, ToolBackend};
use super::command::{OutputMode, ToolCommand};
use super::params::{ConvertParams, ResizeParams};
use crate::config::ToolsConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Backend driving `exiftool`, ImageMagick and `ffmpeg` as subprocesses.
#[derive(Debug, Clone)]
pub struct ExternalBackend {
    exiftool: PathBuf,
    ffmpeg: PathBuf,
    imagemagick: PathBuf,
    timeout: Option<Duration>,
}

impl ExternalBackend {
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            exiftool: PathBuf::from(&tools.exiftool),
            ffmpeg: PathBuf::from(&tools.ffmpeg),
            imagemagick: PathBuf::from(&tools.imagemagick),
            timeout: Some(Duration::from_secs(tools.timeout_secs)),
        }
    }

    fn export_command(&self, source: &Path) -> ToolCommand {
        ToolCommand::new(&self.exiftool)
            .arg("-X")
            .arg(source)
            .current_dir(source.parent())
    }

    fn import_command(&self, target: &Path, sidecar: &Path) -> ToolCommand {
        ToolCommand::new(&self.exiftool)
            .args(["-overwrite_original", "-tagsfromfile"])
            .arg(sidecar)
            .arg(target)
            .current_dir(target.parent())
    }

    fn convert_command(&self, params: &ConvertParams) -> ToolCommand {
        ToolCommand::new(&self.imagemagick)
            .arg(&params.source)
            .arg("-quality")
            .arg(params.quality.value().to_string())
            .arg(&params.output)
            .current_dir(params.output.parent())
    }

    fn resize_command(&self, params: &ResizeParams) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg)
            .arg("-i")
            .arg(&params.source)
            .args(["-movflags", "use_metadata_tags", "-map_metadata", "0"])
            .arg("-vf")
            .arg(params.scale.to_string())
            .arg(&params.output)
            .current_dir(params.output.parent())
    }
}

impl Default for ExternalBackend {
    fn default() -> Self {
        Self::new(&ToolsConfig::default())
    }
}

impl ToolBackend for ExternalBackend {
    fn export_metadata(&self, source: &Path) -> Result<Vec<String>, BackendError> {
        self.export_command(source)
            .run(OutputMode::Capture, self.timeout)
    }

    fn import_metadata(&self, target: &Path, sidecar: &Path) -> Result<(), BackendError> {
        self.import_command(target, sidecar)
            .run(OutputMode::DiscardStdout, self.timeout)?;
        Ok(())
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        self.convert_command(params)
            .run(OutputMode::DiscardStdout, self.timeout)?;
        Ok(())
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let mode = if params.verbose {
            OutputMode::Inherit
        } else {
            OutputMode::Discard
        };
        self.resize_command(params).run(mode, self.timeout)?;
        Ok(())
    }
}
