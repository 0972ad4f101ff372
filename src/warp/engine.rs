use crate::foundation::core::{Placement, Point, Rgba8};
use crate::foundation::error::{MorphError, MorphResult};
use crate::geometry::line::FeatureLine;
use crate::pipeline::cancel::CancelToken;
use crate::raster::image::ImageRGBA;
use crate::raster::sample::sample_bilinear;
use crate::warp::backend::{PixelKernel, RasterBackend};
use crate::warp::field::{DisplacementField, WarpParams};

/// Inputs of one warp.
#[derive(Clone, Copy, Debug)]
pub struct WarpSpec<'a> {
    /// Image supplying the colors.
    pub image: &'a ImageRGBA,
    /// Where `image` sits in its view; must match the image size.
    pub placement: Placement,
    /// Feature lines drawn on `image`, in view coordinates.
    pub source_lines: &'a [FeatureLine],
    /// Where those lines should end up, index-aligned with `source_lines`.
    pub target_lines: &'a [FeatureLine],
    /// Output rectangle in view coordinates; sets the output size.
    pub output: Placement,
    /// Weight falloff constants.
    pub params: WarpParams,
    /// Color for samples that fall outside `image`.
    pub background: Rgba8,
}

struct WarpKernel<'a> {
    field: DisplacementField,
    image: &'a ImageRGBA,
    placement: Placement,
    output: Placement,
    background: Rgba8,
}

impl PixelKernel for WarpKernel<'_> {
    fn shade(&self, x: u32, y: u32) -> Rgba8 {
        let view = Point::new(
            f64::from(x) + self.output.offset.x,
            f64::from(y) + self.output.offset.y,
        );
        let src = self.field.source_point(view);
        sample_bilinear(
            self.image,
            src.x - self.placement.offset.x,
            src.y - self.placement.offset.y,
            self.background,
        )
    }
}

/// Resample `spec.image` so that its feature lines move onto `spec.target_lines`.
///
/// Every output pixel is mapped back into the source image through the weighted
/// [`DisplacementField`] and sampled bilinearly. The input is not modified; the result is a new
/// `spec.output.width x spec.output.height` image.
pub fn warp_image(
    spec: &WarpSpec<'_>,
    backend: &dyn RasterBackend,
    cancel: &CancelToken,
) -> MorphResult<ImageRGBA> {
    if spec.placement.width != spec.image.width() || spec.placement.height != spec.image.height()
    {
        return Err(MorphError::invalid(format!(
            "placement {}x{} does not match image {}x{}",
            spec.placement.width,
            spec.placement.height,
            spec.image.width(),
            spec.image.height()
        )));
    }

    let field = DisplacementField::new(spec.source_lines, spec.target_lines, spec.params)?;
    let kernel = WarpKernel {
        field,
        image: spec.image,
        placement: spec.placement,
        output: spec.output,
        background: spec.background,
    };
    backend.rasterize(spec.output.width, spec.output.height, &kernel, cancel)
}

#[cfg(test)]
#[path = "../../tests/unit/warp/engine.rs"]
mod tests;
