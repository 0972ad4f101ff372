//! JSON job description.
//!
//! ```json
//! {
//!   "source": "a.png",
//!   "destination": "b.png",
//!   "view": { "width": 400, "height": 300 },
//!   "frames": 5,
//!   "weights": { "a": 1.0, "b": 2.0, "p": 0.0 },
//!   "background": [255, 255, 255, 255],
//!   "base_name": "face",
//!   "lines": [
//!     { "source": { "start": [120, 80], "end": [130, 200] },
//!       "destination": { "start": [140, 90], "end": [135, 210] } }
//!   ]
//! }
//! ```
//!
//! Image paths are relative to the JSON file. When `view` is set, both images are scaled to fit
//! it and centered, and line coordinates refer to that view; otherwise images are used at native
//! size with the view origin at their top-left corner.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Point, Rgba8, WHITE};
use crate::foundation::error::{MorphError, MorphResult};
use crate::geometry::line::{FeatureLine, LinePairing};
use crate::pipeline::job::{MorphInput, MorphJob};
use crate::raster::codec::open_image;
use crate::raster::fit::fit_center;
use crate::warp::field::WarpParams;

/// A point written either as `[x, y]` or `{ "x": .., "y": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointDef {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl<'de> Deserialize<'de> for PointDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Arr([f64; 2]),
            Obj { x: f64, y: f64 },
        }

        match Repr::deserialize(deserializer)? {
            Repr::Arr([x, y]) | Repr::Obj { x, y } => Ok(Self { x, y }),
        }
    }
}

impl From<PointDef> for Point {
    fn from(p: PointDef) -> Self {
        Point::new(p.x, p.y)
    }
}

impl From<Point> for PointDef {
    fn from(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// One line as written in the job file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineDef {
    /// Start point.
    pub start: PointDef,
    /// End point.
    pub end: PointDef,
}

impl From<LineDef> for FeatureLine {
    fn from(l: LineDef) -> Self {
        FeatureLine::new(l.start, l.end)
    }
}

impl From<FeatureLine> for LineDef {
    fn from(l: FeatureLine) -> Self {
        Self {
            start: l.start.into(),
            end: l.end.into(),
        }
    }
}

/// A corresponding pair of lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePairDef {
    /// Line on the source image.
    pub source: LineDef,
    /// Corresponding line on the destination image.
    pub destination: LineDef,
}

fn default_frames() -> u32 {
    5
}

fn default_background() -> Rgba8 {
    WHITE
}

/// Deserialized job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MorphSpec {
    /// Source image path, relative to the job file.
    pub source: PathBuf,
    /// Destination image path, relative to the job file.
    pub destination: PathBuf,
    /// View both images are fitted into; line coordinates refer to it.
    #[serde(default)]
    pub view: Option<Canvas>,
    /// Number of in-between frames.
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Weight falloff constants.
    #[serde(default)]
    pub weights: WarpParams,
    /// Out-of-bounds and padding color, straight-alpha RGBA8.
    #[serde(default = "default_background")]
    pub background: Rgba8,
    /// Artifact base name; the CLI picks a timestamped one when absent.
    #[serde(default)]
    pub base_name: Option<String>,
    /// Line correspondences, in order.
    pub lines: Vec<LinePairDef>,
}

impl MorphSpec {
    /// Parse a job from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> MorphResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| MorphError::invalid(format!("parse morph job JSON: {e}")))
    }

    /// Parse a job file from disk.
    pub fn load(path: impl AsRef<Path>) -> MorphResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            MorphError::invalid(format!("open morph job JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Validated line pairing.
    pub fn pairing(&self) -> MorphResult<LinePairing> {
        LinePairing::from_pairs(
            self.lines
                .iter()
                .map(|p| (FeatureLine::from(p.source), FeatureLine::from(p.destination))),
        )
    }

    /// Load both images (paths resolved against `root`) and build a validated job.
    pub fn into_job(self, root: &Path) -> MorphResult<MorphJob> {
        let lines = self.pairing()?;
        let source = self.load_input(&root.join(&self.source))?;
        let destination = self.load_input(&root.join(&self.destination))?;
        MorphJob::with_options(
            source,
            destination,
            lines,
            self.frames,
            self.weights,
            self.background,
        )
    }

    fn load_input(&self, path: &Path) -> MorphResult<MorphInput> {
        let image = open_image(path)?;
        match self.view {
            Some(view) => {
                let (image, placement) = fit_center(&image, view)?;
                Ok(MorphInput { image, placement })
            }
            None => Ok(MorphInput::at_origin(image)),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
