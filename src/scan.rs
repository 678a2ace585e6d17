//! Input tree enumeration.
//!
//! Walks the input directory and turns every regular file into a job with an
//! output path that mirrors its position under the output root:
//!
//! ```text
//! input/                          output/
//! ├── a.jpg          ──resize──▶  ├── a.jpg
//! ├── trip/                       ├── trip/
//! │   ├── b.png      ──resize──▶  │   ├── b.jpg      # extension normalized
//! │   └── notes.txt  ──copy────▶  │   └── notes.txt  # passed through as-is
//! ```
//!
//! Images get the baseline extension on the output side; everything else
//! keeps its name. Entries are visited in file-name order. If the output
//! root lies inside the input tree it is skipped so a run never feeds on its
//! own results.
//!
//! Since extensions are normalized, `a.jpeg` and `a.jpg` both map to
//! `a.jpg`. The first one visited keeps the output; later ones are set aside
//! as duplicates.

use crate::kind::{ImageKind, with_baseline_extension};
use crate::process::ImageJob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A non-image file copied verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct PassThrough {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Everything found under an input root.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub images: Vec<ImageJob>,
    pub others: Vec<PassThrough>,
    /// Images whose output path an earlier image already claimed.
    pub duplicates: Vec<ImageJob>,
    /// Entries that could not be read. The rest of the walk continues.
    pub errors: Vec<walkdir::Error>,
}

/// Mirror `source` (somewhere under `input_root`) onto `output_root`.
pub fn mirrored_path(source: &Path, input_root: &Path, output_root: &Path) -> PathBuf {
    let relative = source.strip_prefix(input_root).unwrap_or(source);
    output_root.join(relative)
}

/// Output path for an image: mirrored, with the baseline extension.
pub fn image_output_path(source: &Path, input_root: &Path, output_root: &Path) -> PathBuf {
    with_baseline_extension(&mirrored_path(source, input_root, output_root))
}

/// Recursively list and classify every regular file under `input_root`.
pub fn scan(input_root: &Path, output_root: &Path) -> ScanResult {
    let mut result = ScanResult::default();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    let walker = WalkDir::new(input_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || entry.path() != output_root);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                result.errors.push(e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let source = entry.path();
        match ImageKind::from_path(source) {
            Some(kind) => {
                let job = ImageJob {
                    source: source.to_path_buf(),
                    output: image_output_path(source, input_root, output_root),
                    kind,
                };
                if claimed.insert(job.output.clone()) {
                    result.images.push(job);
                } else {
                    result.duplicates.push(job);
                }
            }
            None => result.others.push(PassThrough {
                source: source.to_path_buf(),
                output: mirrored_path(source, input_root, output_root),
            }),
        }
    }

    result
}
