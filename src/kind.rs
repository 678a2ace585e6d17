//! Image format classification by file extension.
//!
//! Classification is a pure function of the path's extension: no bytes are
//! read. Anything that is not one of the supported extensions is "not an
//! image" and gets copied through untouched by the batch driver.
//!
//! | Extension | Kind | Needs normalization |
//! |---|---|---|
//! | `.jpg`, `.jpeg` | [`ImageKind::Jpeg`] | no |
//! | `.png` | [`ImageKind::Png`] | yes |
//! | `.heic` | [`ImageKind::Heic`] | yes |
//! | `.webp` | [`ImageKind::Webp`] | yes |
//!
//! Matching is case-insensitive (`IMG_0001.JPG` is a JPEG).

use std::path::{Path, PathBuf};

/// Extension of the baseline format every image is normalized to.
pub const BASELINE_EXTENSION: &str = "jpg";

/// A supported image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Jpeg,
    Png,
    Heic,
    Webp,
}

impl ImageKind {
    /// Classify a path by extension. `None` means "not an image".
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "heic" => Some(Self::Heic),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Whether this format must be transcoded to the baseline before resizing.
    pub fn needs_normalization(self) -> bool {
        match self {
            Self::Jpeg => false,
            Self::Png | Self::Heic | Self::Webp => true,
        }
    }

    /// Kind of the file the pipeline works on after normalization.
    pub fn working_kind(self) -> Self {
        if self.needs_normalization() {
            Self::Jpeg
        } else {
            self
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Heic => "HEIC",
            Self::Webp => "WEBP",
        }
    }
}

/// Classify a path. Shorthand for [`ImageKind::from_path`].
pub fn classify(path: &Path) -> Option<ImageKind> {
    ImageKind::from_path(path)
}

/// Swap a path's extension for the baseline one (`b.png` → `b.jpg`).
pub fn with_baseline_extension(path: &Path) -> PathBuf {
    path.with_extension(BASELINE_EXTENSION)
}
