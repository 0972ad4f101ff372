use image::imageops::{self, FilterType};

use crate::foundation::core::{Canvas, Placement, Vec2};
use crate::foundation::error::{MorphError, MorphResult};
use crate::raster::image::ImageRGBA;

/// Size and placement of an image scaled to fit `view` while keeping its aspect ratio.
///
/// The image fills the view along its constraining axis and is centered along the other one.
pub fn fit_placement(image: Canvas, view: Canvas) -> MorphResult<Placement> {
    if image.width == 0 || image.height == 0 || view.width == 0 || view.height == 0 {
        return Err(MorphError::invalid(format!(
            "cannot fit {}x{} image into {}x{} view",
            image.width, image.height, view.width, view.height
        )));
    }

    let view_ratio = f64::from(view.width) / f64::from(view.height);
    let image_ratio = f64::from(image.width) / f64::from(image.height);
    let (width, height) = if image_ratio > view_ratio {
        let h = (f64::from(view.width) / image_ratio) as u32;
        (view.width, h.max(1))
    } else {
        let w = (f64::from(view.height) * image_ratio) as u32;
        (w.max(1), view.height)
    };

    Ok(Placement {
        offset: Vec2::new(
            f64::from((view.width - width) / 2),
            f64::from((view.height - height) / 2),
        ),
        width,
        height,
    })
}

/// Scale `image` to fit `view` and return the resized copy with its placement.
pub fn fit_center(image: &ImageRGBA, view: Canvas) -> MorphResult<(ImageRGBA, Placement)> {
    let placement = fit_placement(image.canvas(), view)?;
    if placement.width == image.width() && placement.height == image.height() {
        return Ok((image.clone(), placement));
    }

    let src = image::RgbaImage::from_raw(image.width(), image.height(), image.as_bytes().to_vec())
        .ok_or_else(|| MorphError::invalid("image buffer does not match its dimensions"))?;
    let scaled = imageops::resize(
        &src,
        placement.width,
        placement.height,
        FilterType::Triangle,
    );
    tracing::debug!(
        from_w = image.width(),
        from_h = image.height(),
        to_w = placement.width,
        to_h = placement.height,
        "fitted image into view"
    );
    let out = ImageRGBA::from_raw(placement.width, placement.height, scaled.into_raw())?;
    Ok((out, placement))
}

#[cfg(test)]
#[path = "../../tests/unit/raster/fit.rs"]
mod tests;
