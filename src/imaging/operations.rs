//! High-level image operations.
//!
//! These functions combine the pure calculations with backend execution:
//! they compute parameters, call the backend, and handle the local file
//! effects (sidecar writing) around each call.

use super::backend::{BackendError, ToolBackend};
use super::calculations::ResizePlan;
use super::params::{ConvertParams, Quality, ResizeParams};
use crate::kind::ImageKind;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Extension appended to a file name to form its sidecar (`a.jpg` → `a.jpg.xml`).
pub const SIDECAR_SUFFIX: &str = ".xml";

/// Width/height tag pair for one kind's metadata vocabulary.
struct DimensionTags {
    width: Regex,
    height: Regex,
}

impl DimensionTags {
    fn new(group: &str) -> Self {
        let tag = |name: &str| {
            Regex::new(&format!("^<{group}:{name}>(.*)</{group}:{name}>$"))
                .expect("dimension tag pattern is valid")
        };
        Self {
            width: tag("ImageWidth"),
            height: tag("ImageHeight"),
        }
    }
}

static FILE_TAGS: LazyLock<DimensionTags> = LazyLock::new(|| DimensionTags::new("File"));
static PNG_TAGS: LazyLock<DimensionTags> = LazyLock::new(|| DimensionTags::new("PNG"));
static RIFF_TAGS: LazyLock<DimensionTags> = LazyLock::new(|| DimensionTags::new("RIFF"));

fn dimension_tags(kind: ImageKind) -> &'static DimensionTags {
    match kind {
        ImageKind::Jpeg | ImageKind::Heic => &FILE_TAGS,
        ImageKind::Png => &PNG_TAGS,
        ImageKind::Webp => &RIFF_TAGS,
    }
}

/// Metadata exported from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    /// `None` when the dump had no parseable width tag for the kind.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Tool output, verbatim, newline-joined.
    pub raw_text: String,
    /// Where `raw_text` was written.
    pub sidecar_path: PathBuf,
}

/// Sidecar location for `source`: the full file name plus `.xml`.
pub fn sidecar_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn parse_positive(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|&v| v > 0)
}

/// Scan a metadata dump for the kind's width/height tags.
///
/// Lines are trimmed and must match a tag in full. When a tag appears more
/// than once the last occurrence wins.
pub fn parse_dimensions(lines: &[String], kind: ImageKind) -> (Option<u32>, Option<u32>) {
    let tags = dimension_tags(kind);
    let mut width = None;
    let mut height = None;
    for line in lines {
        let line = line.trim();
        if let Some(caps) = tags.width.captures(line) {
            width = parse_positive(&caps[1]);
        }
        if let Some(caps) = tags.height.captures(line) {
            height = parse_positive(&caps[1]);
        }
    }
    (width, height)
}

/// Export all metadata of `source` and persist it to its sidecar.
///
/// Succeeds whenever the tool exits cleanly, even if no dimension tag was
/// found; the record then carries `None` dimensions.
pub fn export_metadata(
    backend: &impl ToolBackend,
    source: &Path,
    kind: ImageKind,
) -> Result<MetadataRecord> {
    info!(file = %source.display(), "exporting metadata");
    let lines = backend.export_metadata(source)?;
    let (width, height) = parse_dimensions(&lines, kind);
    debug!(
        width = ?width,
        height = ?height,
        lines = lines.len(),
        "parsed {} dimensions",
        kind.name()
    );

    let raw_text = lines.join("\n");
    let sidecar_path = sidecar_path(source);
    std::fs::write(&sidecar_path, &raw_text)?;

    Ok(MetadataRecord {
        width,
        height,
        raw_text,
        sidecar_path,
    })
}

/// Re-apply a sidecar's tags onto `target`, in place.
pub fn import_metadata(backend: &impl ToolBackend, target: &Path, sidecar: &Path) -> Result<()> {
    info!(sidecar = %sidecar.display(), "importing metadata");
    backend.import_metadata(target, sidecar)
}

/// Transcode `source` to the baseline format at `working` at maximum quality.
pub fn normalize(backend: &impl ToolBackend, source: &Path, kind: ImageKind, working: &Path) -> Result<()> {
    info!(
        file = %source.display(),
        working = %working.display(),
        "normalizing {} to JPEG",
        kind.name()
    );
    backend.convert(&ConvertParams {
        source: source.to_path_buf(),
        output: working.to_path_buf(),
        quality: Quality::default(),
    })
}

/// Run the resize tool for a plan that needs it.
///
/// Plans that do not call for a resize are rejected: the caller decides
/// between copying and failing before getting here.
pub fn resize(
    backend: &impl ToolBackend,
    working: &Path,
    output: &Path,
    plan: &ResizePlan,
    verbose: bool,
) -> Result<()> {
    let Some(scale) = plan.scale() else {
        return Err(BackendError::ProcessingFailed(format!(
            "no resize planned for {}",
            working.display()
        )));
    };
    info!(file = %working.display(), %scale, "resizing");
    backend.resize(&ResizeParams {
        source: working.to_path_buf(),
        output: output.to_path_buf(),
        scale,
        verbose,
    })
}
