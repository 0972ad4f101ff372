use std::io::Cursor;
use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{MorphError, MorphResult};
use crate::raster::image::ImageRGBA;

/// Decode any format supported by `image` into straight-alpha RGBA8.
pub fn decode_image(bytes: &[u8]) -> MorphResult<ImageRGBA> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| MorphError::codec(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    ImageRGBA::from_raw(width, height, rgba.into_raw())
}

/// Read and decode an image file.
pub fn open_image(path: &Path) -> MorphResult<ImageRGBA> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
}

/// Encode as lossless PNG.
pub fn encode_png(image: &ImageRGBA) -> MorphResult<Vec<u8>> {
    let mut buf = Vec::new();
    image::write_buffer_with_format(
        &mut Cursor::new(&mut buf),
        image.as_bytes(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|e| MorphError::codec(format!("encode png: {e}")))?;
    Ok(buf)
}

/// Encode as PNG and write to `path`, creating parent directories as needed.
pub fn save_png(image: &ImageRGBA, path: &Path) -> MorphResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/codec.rs"]
mod tests;
