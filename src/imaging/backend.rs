//! Tool backend trait and shared error type.
//!
//! The [`ToolBackend`] trait defines the four external operations the
//! pipeline depends on: dump metadata, re-apply metadata, transcode to the
//! baseline format, and resize.
//!
//! The production implementation is
//! [`ExternalBackend`](super::external_backend::ExternalBackend), which shells
//! out to `exiftool`, ImageMagick and `ffmpeg`. Tests use the recording
//! [`MockBackend`](tests::MockBackend).

use super::params::{ConvertParams, ResizeParams};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed ({status})")]
    Failed { program: String, status: String },
    #[error("{program} did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for external tool backends.
///
/// Every backend must implement all four operations so the pipeline is
/// backend-agnostic. `Sync` because files are processed on a rayon pool.
pub trait ToolBackend: Sync {
    /// Dump every metadata tag of `source` as structured text, one line per
    /// entry, exactly as the tool printed it.
    fn export_metadata(&self, source: &Path) -> Result<Vec<String>, BackendError>;

    /// Overwrite `target`'s metadata in place with the tags in `sidecar`.
    fn import_metadata(&self, target: &Path, sidecar: &Path) -> Result<(), BackendError>;

    /// Transcode to the baseline format.
    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError>;

    /// Resize, keeping container-level metadata.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;
}
