//! Per-file resize pipeline.
//!
//! Takes one image from source to finished output:
//!
//! ```text
//! Start ──normalize──▶ Normalized ──export──▶ MetadataExported ─┬─copy────▶ Copied ───────────────────────┐
//!  (PNG/HEIC/WEBP only)                 (sidecar .xml)          └─resize──▶ Resized ──import──▶ Imported ─┴─▶ Done
//! ```
//!
//! Each step is fallible and the first failure ends the file: there is no
//! rollback, so a failed resize may leave a partial output behind. Whatever
//! happens, the working copy and sidecar are removed when the pipeline
//! returns (or unwinds) unless temporaries are being kept.
//!
//! ## Working files
//!
//! For `photos/b.png` the pipeline creates, next to the source:
//!
//! ```text
//! photos/
//! ├── b.png        # source, never modified
//! ├── b.jpg        # working copy (normalized)
//! └── b.jpg.xml    # metadata sidecar
//! ```
//!
//! JPEG sources are their own working copy and only get a sidecar. If the
//! working path or the sidecar path is already taken (e.g. `b.jpg` is itself
//! an input, or the user keeps notes in `a.jpg.xml`) the file fails rather
//! than overwrite it. So does an output path that resolves to the source or
//! to one of these temporaries. All of these checks happen before the old
//! output is removed.

use crate::imaging::{
    BackendError, ResizePlan, Scale, ToolBackend, export_metadata, import_metadata, normalize,
    plan_resize, resize, sidecar_path,
};
use crate::kind::{ImageKind, with_baseline_extension};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Tool failed: {0}")]
    Backend(#[from] BackendError),
    #[error("No usable image dimensions in metadata of {0}")]
    UnknownDimensions(PathBuf),
    #[error("Working copy path already exists: {0}")]
    WorkingCopyConflict(PathBuf),
    #[error("Metadata sidecar path already exists: {0}")]
    SidecarConflict(PathBuf),
    #[error("Output would overwrite an input file: {0}")]
    OutputIsInput(PathBuf),
    #[error("Another input already maps to output {0}")]
    DuplicateOutput(PathBuf),
}

/// One image to push through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageJob {
    pub source: PathBuf,
    pub output: PathBuf,
    pub kind: ImageKind,
}

/// Settings shared by every file of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Target length of the short side, in pixels.
    pub length: u32,
    /// Pass resize tool output through.
    pub verbose: bool,
    /// Skip deleting working copies and sidecars.
    pub keep_temporaries: bool,
}

/// How a successfully processed image reached its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Resized { width: u32, height: u32, scale: Scale },
    /// Already small enough; working copy copied verbatim.
    Copied { width: u32, height: u32 },
}

/// Temporary files owned by one pipeline run, deleted on drop.
struct TempArtifacts {
    paths: Vec<PathBuf>,
    keep: bool,
}

impl TempArtifacts {
    fn new(keep: bool) -> Self {
        Self {
            paths: Vec::new(),
            keep,
        }
    }

    fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        if self.keep {
            for path in &self.paths {
                debug!(path = %path.display(), "keeping temporary file");
            }
            return;
        }
        for path in &self.paths {
            if let Err(e) = delete_file(path) {
                warn!(path = %path.display(), error = %e, "failed to remove temporary file");
            }
        }
    }
}

/// Delete a file; a missing file is not an error.
pub fn delete_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Copy bytes and carry over the source's modification time.
pub fn copy_verbatim(source: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(source, dest)?;
    let modified = fs::metadata(source)?.modified()?;
    OpenOptions::new()
        .write(true)
        .open(dest)?
        .set_modified(modified)
}

/// Claim `path` for a temporary file. Fails with `conflict` if anything
/// already lives there, including a file another worker just claimed.
fn reserve(path: &Path, conflict: fn(PathBuf) -> ProcessError) -> Result<(), ProcessError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map(drop)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => conflict(path.to_path_buf()),
            _ => ProcessError::Io(e),
        })
}

/// Absolute form of `path` for identity checks. A path that does not exist
/// yet is resolved through its parent directory.
pub fn resolved_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            fs::canonicalize(parent)
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

/// Run the full pipeline for one image.
pub fn process_image(
    backend: &impl ToolBackend,
    job: &ImageJob,
    options: &PipelineOptions,
) -> Result<ImageOutcome, ProcessError> {
    let normalizing = job.kind.needs_normalization();
    let working = if normalizing {
        with_baseline_extension(&job.source)
    } else {
        job.source.clone()
    };
    let sidecar = sidecar_path(&working);

    // Nothing may be deleted or reserved until the output is known not to
    // be one of the files this job reads or creates.
    let output = resolved_path(&job.output);
    if [&job.source, &working, &sidecar]
        .into_iter()
        .any(|path| resolved_path(path) == output)
    {
        return Err(ProcessError::OutputIsInput(job.output.clone()));
    }

    let mut temps = TempArtifacts::new(options.keep_temporaries);
    if normalizing {
        reserve(&working, ProcessError::WorkingCopyConflict)?;
        temps.track(working.clone());
    }
    reserve(&sidecar, ProcessError::SidecarConflict)?;
    temps.track(sidecar);

    delete_file(&job.output)?;
    if normalizing {
        normalize(backend, &job.source, job.kind, &working)?;
    }
    let record = export_metadata(backend, &working, job.kind.working_kind())?;

    match plan_resize(record.width, record.height, options.length) {
        ResizePlan::UnknownDimensions => Err(ProcessError::UnknownDimensions(working)),
        plan @ ResizePlan::Keep => {
            debug!(?plan, "short side within target, copying");
            copy_verbatim(&working, &job.output)?;
            Ok(ImageOutcome::Copied {
                width: record.width.unwrap_or_default(),
                height: record.height.unwrap_or_default(),
            })
        }
        plan @ ResizePlan::Resize(scale) => {
            resize(backend, &working, &job.output, &plan, options.verbose)?;
            import_metadata(backend, &job.output, &record.sidecar_path)?;
            Ok(ImageOutcome::Resized {
                width: record.width.unwrap_or_default(),
                height: record.height.unwrap_or_default(),
                scale,
            })
        }
    }
}
