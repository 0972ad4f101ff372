use crate::foundation::core::Rgba8;
use crate::foundation::math::quantize_u8;
use crate::raster::image::ImageRGBA;

/// Bilinearly sample `image` at pixel coordinates `(u, v)`.
///
/// Pixel `(x, y)` sits at integer coordinates, so integer positions return the stored pixel
/// exactly. Taps that fall outside the image contribute `background` instead; a position far
/// outside the image therefore resolves to `background`.
pub fn sample_bilinear(image: &ImageRGBA, u: f64, v: f64, background: Rgba8) -> Rgba8 {
    if !u.is_finite() || !v.is_finite() {
        return background;
    }

    let x0 = u.floor();
    let y0 = v.floor();
    let fx = u - x0;
    let fy = v - y0;

    let w00 = (1.0 - fx) * (1.0 - fy);
    let w10 = fx * (1.0 - fy);
    let w01 = (1.0 - fx) * fy;
    let w11 = fx * fy;

    let p00 = tap(image, x0, y0, background);
    let p10 = tap(image, x0 + 1.0, y0, background);
    let p01 = tap(image, x0, y0 + 1.0, background);
    let p11 = tap(image, x0 + 1.0, y0 + 1.0, background);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let v = f64::from(p00[c]) * w00
            + f64::from(p10[c]) * w10
            + f64::from(p01[c]) * w01
            + f64::from(p11[c]) * w11;
        out[c] = quantize_u8(v);
    }
    out
}

fn tap(image: &ImageRGBA, x: f64, y: f64, background: Rgba8) -> Rgba8 {
    if x < 0.0 || y < 0.0 || x >= f64::from(image.width()) || y >= f64::from(image.height()) {
        return background;
    }
    image.pixel(x as u32, y as u32).unwrap_or(background)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/sample.rs"]
mod tests;
