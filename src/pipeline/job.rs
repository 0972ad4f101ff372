use crate::foundation::core::{Placement, Rgba8, WHITE, check_frame_count};
use crate::foundation::error::{MorphError, MorphResult};
use crate::geometry::line::LinePairing;
use crate::raster::image::ImageRGBA;
use crate::warp::field::WarpParams;

/// One side of a morph: an image and where it sits in its view.
#[derive(Clone, Debug)]
pub struct MorphInput {
    /// Pixels.
    pub image: ImageRGBA,
    /// Rectangle the image occupies in the view its feature lines were drawn in.
    pub placement: Placement,
}

impl MorphInput {
    /// Input placed at the view origin at native size.
    pub fn at_origin(image: ImageRGBA) -> Self {
        let placement = Placement::at_origin(image.width(), image.height());
        Self { image, placement }
    }

    fn validate(&self, side: &str) -> MorphResult<()> {
        let p = self.placement;
        if p.width != self.image.width() || p.height != self.image.height() {
            return Err(MorphError::invalid(format!(
                "{side} placement {}x{} does not match image {}x{}",
                p.width,
                p.height,
                self.image.width(),
                self.image.height()
            )));
        }
        if !(p.offset.x.is_finite() && p.offset.y.is_finite()) {
            return Err(MorphError::invalid(format!(
                "{side} placement offset must be finite"
            )));
        }
        Ok(())
    }
}

/// Immutable description of one morph run.
///
/// Everything is validated up front; once built, a job is shared read-only by every worker.
#[derive(Clone, Debug)]
pub struct MorphJob {
    source: MorphInput,
    destination: MorphInput,
    lines: LinePairing,
    frames: u32,
    params: WarpParams,
    background: Rgba8,
}

impl MorphJob {
    /// Build a job with default weights and a white background.
    pub fn new(
        source: MorphInput,
        destination: MorphInput,
        lines: LinePairing,
        frames: u32,
    ) -> MorphResult<Self> {
        Self::with_options(
            source,
            destination,
            lines,
            frames,
            WarpParams::default(),
            WHITE,
        )
    }

    /// Build a job with explicit weights and background color.
    pub fn with_options(
        source: MorphInput,
        destination: MorphInput,
        lines: LinePairing,
        frames: u32,
        params: WarpParams,
        background: Rgba8,
    ) -> MorphResult<Self> {
        let frames = check_frame_count(frames)?;
        params.validate()?;
        source.validate("source")?;
        destination.validate("destination")?;
        Ok(Self {
            source,
            destination,
            lines,
            frames,
            params,
            background,
        })
    }

    /// Source side.
    pub fn source(&self) -> &MorphInput {
        &self.source
    }

    /// Destination side.
    pub fn destination(&self) -> &MorphInput {
        &self.destination
    }

    /// Feature line correspondence.
    pub fn lines(&self) -> &LinePairing {
        &self.lines
    }

    /// Number of in-between frames.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Output slots including both endpoints: `frames + 2`.
    pub fn slot_count(&self) -> usize {
        self.frames as usize + 2
    }

    /// Weight falloff constants.
    pub fn params(&self) -> WarpParams {
        self.params
    }

    /// Out-of-bounds and padding color.
    pub fn background(&self) -> Rgba8 {
        self.background
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/job.rs"]
mod tests;
