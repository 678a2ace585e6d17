//! Pure resize decision.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Scale;

/// Outcome of [`plan_resize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// Short side exceeds the target: resize with this scale.
    Resize(Scale),
    /// Already small enough: copy verbatim.
    Keep,
    /// Width or height is missing or zero. No scale can be chosen safely.
    UnknownDimensions,
}

impl ResizePlan {
    pub fn needed(&self) -> bool {
        matches!(self, ResizePlan::Resize(_))
    }

    pub fn scale(&self) -> Option<Scale> {
        match self {
            ResizePlan::Resize(scale) => Some(*scale),
            ResizePlan::Keep | ResizePlan::UnknownDimensions => None,
        }
    }
}

/// Decide whether an image needs resizing to `target` on its short side.
///
/// # Examples
/// ```
/// # use img_resizer::imaging::{plan_resize, ResizePlan, Scale};
/// // 3000x2000 landscape → pin height
/// assert_eq!(plan_resize(Some(3000), Some(2000), 1920), ResizePlan::Resize(Scale::FixHeight(1920)));
///
/// // 800x600 is already below 1920 on its short side
/// assert_eq!(plan_resize(Some(800), Some(600), 1920), ResizePlan::Keep);
/// ```
pub fn plan_resize(width: Option<u32>, height: Option<u32>, target: u32) -> ResizePlan {
    let (Some(w), Some(h)) = (width.filter(|&w| w > 0), height.filter(|&h| h > 0)) else {
        return ResizePlan::UnknownDimensions;
    };

    if w.min(h) <= target {
        return ResizePlan::Keep;
    }

    if w > h {
        ResizePlan::Resize(Scale::FixHeight(target))
    } else {
        ResizePlan::Resize(Scale::FixWidth(target))
    }
}
