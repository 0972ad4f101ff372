use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{MorphError, MorphResult};

/// Pixel layouts an [`ImageRGBA`] can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit RGBA, straight (non-premultiplied) alpha.
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Owned raster image.
///
/// Pixels are tightly packed, row-major, straight alpha. Every stage of the morph allocates a
/// fresh `ImageRGBA` for its output; inputs are never modified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRGBA {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl ImageRGBA {
    /// Wrap an existing RGBA8 buffer; its length must be `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> MorphResult<Self> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(MorphError::invalid(format!(
                "rgba8 buffer for {width}x{height} must be {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            data,
        })
    }

    /// Allocate an image filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgba8) -> MorphResult<Self> {
        let len = byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for _ in 0..(len / 4) {
            data.extend_from_slice(&color);
        }
        Self::from_raw(width, height, data)
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> Rgba8) -> MorphResult<Self> {
        let len = byte_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::from_raw(width, height, data)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as a [`Canvas`].
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Raw pixel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image and return its pixel bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Read one pixel; `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }
}

fn byte_len(width: u32, height: u32) -> MorphResult<usize> {
    if width == 0 || height == 0 {
        return Err(MorphError::invalid(format!(
            "image dimensions must be non-zero, got {width}x{height}"
        )));
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| MorphError::invalid("image buffer size overflow"))
}

#[cfg(test)]
#[path = "../../tests/unit/raster/image.rs"]
mod tests;
