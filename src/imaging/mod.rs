//! External-tool image operations.
//!
//! | Operation | Tool |
//! |---|---|
//! | **Export metadata** | `exiftool -X` → sidecar `.xml` |
//! | **Import metadata** | `exiftool -tagsfromfile` |
//! | **Normalize** | ImageMagick, quality 100 → JPEG |
//! | **Resize** | `ffmpeg -vf scale=…` |
//!
//! The module is split into:
//! - **Calculations**: the pure resize decision (unit testable)
//! - **Parameters**: data structures describing tool invocations
//! - **Command**: subprocess runner with concurrent output draining and timeouts
//! - **Backend**: [`ToolBackend`] trait + [`ExternalBackend`]
//! - **Operations**: high-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod command;
pub mod external_backend;
pub mod operations;
mod params;

pub use backend::{BackendError, ToolBackend};
pub use calculations::{ResizePlan, plan_resize};
pub use external_backend::ExternalBackend;
pub use operations::{
    MetadataRecord, export_metadata, import_metadata, normalize, parse_dimensions, resize,
    sidecar_path,
};
pub use params::{ConvertParams, Quality, ResizeParams, Scale};
