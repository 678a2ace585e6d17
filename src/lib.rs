//! # img-resizer
//!
//! Batch-resizes images so their short side fits a target length, keeping
//! their metadata. A single image or a whole directory tree goes in; a
//! mirrored tree of JPEGs (plus verbatim copies of everything else) comes out.
//!
//! # Architecture: Per-File Pipeline
//!
//! The heavy lifting is delegated to external tools. Every image runs through
//! the same short sequence of tool invocations:
//!
//! ```text
//! 1. Normalize  PNG/HEIC/WEBP  →  JPEG working copy          (ImageMagick)
//! 2. Export     working copy   →  .xml sidecar + dimensions  (exiftool -X)
//! 3. Resize     working copy   →  output, or copy if small   (ffmpeg scale=…)
//! 4. Import     .xml sidecar   →  output metadata            (exiftool -tagsfromfile)
//! ```
//!
//! Working copies and sidecars are temporary and removed whatever the
//! outcome. Files are independent of each other, so a directory is processed
//! in parallel and one failing file never stops the rest.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`kind`] | Format classifier: which extensions are images and how they are handled |
//! | [`imaging`] | Tool backend trait, the production backend, and the pipeline steps built on it |
//! | [`process`] | Per-file pipeline with guaranteed temporary cleanup |
//! | [`scan`] | Walks an input tree into image jobs and pass-through copies |
//! | [`batch`] | Batch driver: parallel fan-out, failure isolation, aggregate report |
//! | [`config`] | Optional `resizer.toml`: tool locations, timeout, workers, temp retention |
//! | [`output`] | CLI output formatting for progress and summary |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! # Design Decisions
//!
//! ## External Tools Behind a Trait
//!
//! `exiftool`, `ffmpeg` and ImageMagick are reached only through
//! [`imaging::ToolBackend`]. The production [`imaging::ExternalBackend`] gets
//! its program locations from configuration at construction time; nothing
//! touches the process-wide search path. Tests swap in a recording mock that
//! fakes the file effects, so the whole pipeline runs without any tool
//! installed.
//!
//! ## Refuse to Guess Dimensions
//!
//! The scale filter pins the short side, so the pipeline must know which side
//! is shorter. When the exported metadata has no usable width or height the
//! file fails instead of being resized with a guessed orientation.
//!
//! ## Metadata Round-Trip via Sidecar
//!
//! `ffmpeg` drops most still-image metadata. The pipeline therefore exports
//! everything to an XML sidecar first and re-imports it onto the result, so
//! capture dates, camera data and copyright survive the resize.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod kind;
pub mod logging;
pub mod output;
pub mod process;
pub mod scan;

#[cfg(test)]
pub(crate) mod test_helpers;
