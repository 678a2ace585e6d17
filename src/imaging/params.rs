//! Parameter types for tool invocations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what each file needs) and the [`backend`](super::backend)
//! (which runs the external programs). This separation allows swapping
//! backends (e.g. for testing with a mock) without changing pipeline logic.
//!
//! ## Types
//!
//! - [`Quality`]: Transcode quality (1–100, default 100). Clamped on construction.
//! - [`Scale`]: Which side of the image is pinned to the target length.
//! - [`ResizeParams`]: Everything a resize needs: source, output, scale, verbosity.
//! - [`ConvertParams`]: Everything a format normalization needs.

use std::fmt;
use std::path::PathBuf;

/// Quality setting for the baseline transcode (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    /// Normalization always transcodes at maximum quality.
    fn default() -> Self {
        Self(100)
    }
}

/// Scale filter for the resize tool.
///
/// The short side is pinned to the target length and the long side is left
/// at `-1` so the tool keeps the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    /// Landscape: `scale=-1:<N>`.
    FixHeight(u32),
    /// Portrait or square: `scale=<N>:-1`.
    FixWidth(u32),
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scale::FixHeight(n) => write!(f, "scale=-1:{n}"),
            Scale::FixWidth(n) => write!(f, "scale={n}:-1"),
        }
    }
}

/// Parameters for a resize invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub scale: Scale,
    /// Pass the tool's own stdout/stderr through instead of discarding them.
    pub verbose: bool,
}

/// Parameters for transcoding a file to the baseline format.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub quality: Quality,
}
