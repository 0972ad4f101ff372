use rayon::prelude::*;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{MorphError, MorphResult};
use crate::pipeline::cancel::CancelToken;
use crate::raster::image::ImageRGBA;

/// Per-pixel computation with no dependency between output pixels.
///
/// Warping and cross-dissolving are both expressed as kernels so any [`RasterBackend`] can run
/// them.
pub trait PixelKernel: Sync {
    /// Compute output pixel `(x, y)`.
    fn shade(&self, x: u32, y: u32) -> Rgba8;
}

/// A parallel-for over output pixels.
///
/// Implementations must produce byte-identical images for the same kernel.
pub trait RasterBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Allocate a `width x height` image and fill it with `kernel`.
    ///
    /// The cancellation token is checked between rows; a fired token yields
    /// [`MorphError::Cancelled`].
    fn rasterize(
        &self,
        width: u32,
        height: u32,
        kernel: &dyn PixelKernel,
        cancel: &CancelToken,
    ) -> MorphResult<ImageRGBA>;
}

/// Available backend kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Single-threaded, row by row.
    Serial,
    /// Row bands spread over a rayon pool.
    #[default]
    Rows,
}

/// Backend construction settings.
#[derive(Clone, Debug, Default)]
pub struct BackendSettings {
    /// Dedicated worker count for [`BackendKind::Rows`]; `None` uses the ambient rayon pool.
    pub threads: Option<usize>,
}

/// Create a pixel backend.
pub fn create_backend(
    kind: BackendKind,
    settings: &BackendSettings,
) -> MorphResult<Box<dyn RasterBackend>> {
    match kind {
        BackendKind::Serial => Ok(Box::new(SerialBackend)),
        BackendKind::Rows => {
            let pool = match settings.threads {
                Some(n) => Some(build_thread_pool(Some(n))?),
                None => None,
            };
            Ok(Box::new(RowsBackend { pool }))
        }
    }
}

/// Single-threaded backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialBackend;

impl RasterBackend for SerialBackend {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn rasterize(
        &self,
        width: u32,
        height: u32,
        kernel: &dyn PixelKernel,
        cancel: &CancelToken,
    ) -> MorphResult<ImageRGBA> {
        let mut data = alloc_rgba8(width, height)?;
        let stride = width as usize * 4;
        for (y, row) in data.chunks_exact_mut(stride).enumerate() {
            cancel.check()?;
            shade_row(kernel, y as u32, row);
        }
        ImageRGBA::from_raw(width, height, data)
    }
}

/// Rayon backend processing one row per task.
pub struct RowsBackend {
    pool: Option<rayon::ThreadPool>,
}

impl RasterBackend for RowsBackend {
    fn name(&self) -> &'static str {
        "rows"
    }

    fn rasterize(
        &self,
        width: u32,
        height: u32,
        kernel: &dyn PixelKernel,
        cancel: &CancelToken,
    ) -> MorphResult<ImageRGBA> {
        let mut data = alloc_rgba8(width, height)?;
        let stride = width as usize * 4;
        let run = |data: &mut [u8]| -> MorphResult<()> {
            data.par_chunks_exact_mut(stride)
                .enumerate()
                .try_for_each(|(y, row)| {
                    cancel.check()?;
                    shade_row(kernel, y as u32, row);
                    Ok(())
                })
        };
        match &self.pool {
            Some(pool) => pool.install(|| run(&mut data))?,
            None => run(&mut data)?,
        }
        ImageRGBA::from_raw(width, height, data)
    }
}

fn shade_row(kernel: &dyn PixelKernel, y: u32, row: &mut [u8]) {
    for (x, px) in row.chunks_exact_mut(4).enumerate() {
        px.copy_from_slice(&kernel.shade(x as u32, y));
    }
}

fn alloc_rgba8(width: u32, height: u32) -> MorphResult<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(MorphError::invalid(format!(
            "raster size must be non-zero, got {width}x{height}"
        )));
    }
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| MorphError::invalid("raster buffer size overflow"))?;
    Ok(vec![0u8; len])
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> MorphResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(MorphError::invalid("'threads' must be >= 1 when set"));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MorphError::concurrency(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/warp/backend.rs"]
mod tests;
