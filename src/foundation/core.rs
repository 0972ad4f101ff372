use std::fmt;

use crate::foundation::error::{MorphError, MorphResult};

pub use kurbo::{Point, Vec2};

/// Smallest number of in-between frames a job may request.
pub const MIN_FRAMES: u32 = 1;
/// Largest number of in-between frames a job may request.
pub const MAX_FRAMES: u32 = 30;

/// Straight-alpha RGBA8 color.
pub type Rgba8 = [u8; 4];

/// Opaque white, the default background for out-of-bounds samples and padding.
pub const WHITE: Rgba8 = [255, 255, 255, 255];

/// Position of a frame in the output sequence.
///
/// `0` is the untouched source, `N + 1` the untouched destination and `1..=N` the in-betweens.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u32);

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validate an in-between frame count against `[MIN_FRAMES, MAX_FRAMES]`.
pub fn check_frame_count(frames: u32) -> MorphResult<u32> {
    if !(MIN_FRAMES..=MAX_FRAMES).contains(&frames) {
        return Err(MorphError::invalid(format!(
            "frame count must be within [{MIN_FRAMES}, {MAX_FRAMES}], got {frames}"
        )));
    }
    Ok(frames)
}

/// Pixel dimensions of a view or canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Smallest canvas containing both `self` and `other`.
    pub fn union(self, other: Canvas) -> Canvas {
        Canvas {
            width: self.width.max(other.width),
            height: self.height.max(other.height),
        }
    }
}

/// Rectangle an image occupies inside its view's coordinate system.
///
/// Feature lines live in view coordinates; pixel `(x, y)` of the image sits at
/// `(x + offset.x, y + offset.y)`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    /// Top-left corner of the image in view coordinates.
    pub offset: Vec2,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Placement {
    /// Placement of an image drawn at the view origin at native size.
    pub fn at_origin(width: u32, height: u32) -> Self {
        Self {
            offset: Vec2::ZERO,
            width,
            height,
        }
    }

    /// Pixel dimensions of the placed image.
    pub fn canvas(self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
