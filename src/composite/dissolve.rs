use std::borrow::Cow;

use crate::foundation::core::{Canvas, Rgba8, check_frame_count};
use crate::foundation::error::{MorphError, MorphResult};
use crate::foundation::math::quantize_u8;
use crate::pipeline::cancel::CancelToken;
use crate::raster::image::ImageRGBA;
use crate::warp::backend::{PixelKernel, RasterBackend};

/// Blend weights `(w1, w2)` of in-between frame `k` out of `frames`.
///
/// `w2 = k / (frames + 1)` weighs the destination, `w1 = 1 - w2` the source.
pub fn dissolve_weights(k: u32, frames: u32) -> MorphResult<(f64, f64)> {
    let frames = check_frame_count(frames)?;
    if k == 0 || k > frames {
        return Err(MorphError::invalid(format!(
            "in-between frame index must be within [1, {frames}], got {k}"
        )));
    }
    let w2 = f64::from(k) / (f64::from(frames) + 1.0);
    Ok((1.0 - w2, w2))
}

/// Copy `image` into the middle of a `canvas`-sized buffer filled with `background`.
///
/// The image lands at `((W - w) / 2, (H - h) / 2)` using integer division.
pub fn pad_center(image: &ImageRGBA, canvas: Canvas, background: Rgba8) -> MorphResult<ImageRGBA> {
    if canvas.width < image.width() || canvas.height < image.height() {
        return Err(MorphError::invalid(format!(
            "cannot pad {}x{} image into smaller {}x{} canvas",
            image.width(),
            image.height(),
            canvas.width,
            canvas.height
        )));
    }

    let out = ImageRGBA::filled(canvas.width, canvas.height, background)?;
    let left = ((canvas.width - image.width()) / 2) as usize;
    let top = ((canvas.height - image.height()) / 2) as usize;
    let dst_stride = out.stride();
    let src_stride = image.stride();

    let mut data = out.into_raw();
    for (y, row) in image.as_bytes().chunks_exact(src_stride).enumerate() {
        let start = (top + y) * dst_stride + left * 4;
        data[start..start + src_stride].copy_from_slice(row);
    }
    ImageRGBA::from_raw(canvas.width, canvas.height, data)
}

struct DissolveKernel<'a> {
    a: &'a ImageRGBA,
    b: &'a ImageRGBA,
    w1: f64,
    w2: f64,
}

impl PixelKernel for DissolveKernel<'_> {
    fn shade(&self, x: u32, y: u32) -> Rgba8 {
        let (Some(pa), Some(pb)) = (self.a.pixel(x, y), self.b.pixel(x, y)) else {
            return [0; 4];
        };
        let mut out = [0u8; 4];
        for c in 0..4 {
            out[c] = quantize_u8(self.w1 * f64::from(pa[c]) + self.w2 * f64::from(pb[c]));
        }
        out
    }
}

/// Cross-dissolve two images with destination weight `w2`.
///
/// Both inputs are first centered on a common canvas of the larger width and height, padded with
/// `background`. Every channel, alpha included, becomes `w1 * a + w2 * b` rounded and saturated.
pub fn cross_dissolve(
    a: &ImageRGBA,
    b: &ImageRGBA,
    w2: f64,
    background: Rgba8,
    backend: &dyn RasterBackend,
    cancel: &CancelToken,
) -> MorphResult<ImageRGBA> {
    if !w2.is_finite() || !(0.0..=1.0).contains(&w2) {
        return Err(MorphError::invalid(format!(
            "dissolve weight must be within [0, 1], got {w2}"
        )));
    }

    let canvas = a.canvas().union(b.canvas());
    let a = pad_if_needed(a, canvas, background)?;
    let b = pad_if_needed(b, canvas, background)?;
    let kernel = DissolveKernel {
        a: &a,
        b: &b,
        w1: 1.0 - w2,
        w2,
    };
    backend.rasterize(canvas.width, canvas.height, &kernel, cancel)
}

/// Cross-dissolve the two warps of in-between frame `k` out of `frames`.
pub fn dissolve_frame(
    a: &ImageRGBA,
    b: &ImageRGBA,
    k: u32,
    frames: u32,
    background: Rgba8,
    backend: &dyn RasterBackend,
    cancel: &CancelToken,
) -> MorphResult<ImageRGBA> {
    let (_, w2) = dissolve_weights(k, frames)?;
    cross_dissolve(a, b, w2, background, backend, cancel)
}

fn pad_if_needed<'a>(
    image: &'a ImageRGBA,
    canvas: Canvas,
    background: Rgba8,
) -> MorphResult<Cow<'a, ImageRGBA>> {
    if image.canvas() == canvas {
        Ok(Cow::Borrowed(image))
    } else {
        pad_center(image, canvas, background).map(Cow::Owned)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/dissolve.rs"]
mod tests;
