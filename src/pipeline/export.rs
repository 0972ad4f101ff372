use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{MorphError, MorphResult};
use crate::raster::codec::save_png;
use crate::raster::image::ImageRGBA;

/// Destination for finished frames.
///
/// Exports of different indices may run concurrently, so implementations must be thread-safe.
pub trait ExportSink: Send + Sync {
    /// Persist `image` as frame `index` and return where it went.
    fn export(&self, index: FrameIndex, image: &ImageRGBA) -> MorphResult<PathBuf>;
}

/// Artifact name of frame `index`: `{base}_{index}`.
pub fn artifact_name(base: &str, index: FrameIndex) -> String {
    format!("{base}_{index}")
}

/// Writes every frame as `{dir}/{base_name}_{index}.png`.
#[derive(Clone, Debug)]
pub struct PngDirSink {
    dir: PathBuf,
    base_name: String,
}

impl PngDirSink {
    /// Create a sink writing into `dir`; the directory is created on first export.
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> MorphResult<Self> {
        let base_name = base_name.into();
        if base_name.is_empty() || base_name.contains(['/', '\\']) {
            return Err(MorphError::invalid(format!(
                "base name must be a non-empty file name, got {base_name:?}"
            )));
        }
        Ok(Self {
            dir: dir.into(),
            base_name,
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Path frame `index` is written to.
    pub fn path_for(&self, index: FrameIndex) -> PathBuf {
        self.dir
            .join(format!("{}.png", artifact_name(&self.base_name, index)))
    }
}

impl ExportSink for PngDirSink {
    fn export(&self, index: FrameIndex, image: &ImageRGBA) -> MorphResult<PathBuf> {
        let path = self.path_for(index);
        save_png(image, &path).map_err(|e| MorphError::export(index, format!("{e:#}")))?;
        tracing::debug!(%index, path = %path.display(), "frame written");
        Ok(path)
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    base_name: String,
    frames: Mutex<BTreeMap<FrameIndex, ImageRGBA>>,
}

impl InMemorySink {
    /// Create an empty sink naming artifacts after `base_name`.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            frames: Mutex::new(BTreeMap::new()),
        }
    }

    /// Clone of frame `index`, if it was exported.
    pub fn frame(&self, index: FrameIndex) -> Option<ImageRGBA> {
        self.lock().get(&index).cloned()
    }

    /// Exported indices in ascending order.
    pub fn indices(&self) -> Vec<FrameIndex> {
        self.lock().keys().copied().collect()
    }

    /// Take every captured frame in index order.
    pub fn take_frames(&self) -> Vec<(FrameIndex, ImageRGBA)> {
        std::mem::take(&mut *self.lock()).into_iter().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<FrameIndex, ImageRGBA>> {
        self.frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ExportSink for InMemorySink {
    fn export(&self, index: FrameIndex, image: &ImageRGBA) -> MorphResult<PathBuf> {
        self.lock().insert(index, image.clone());
        Ok(PathBuf::from(artifact_name(&self.base_name, index)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/export.rs"]
mod tests;
