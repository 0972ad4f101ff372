//! linemorph is a feature-line image morphing engine.
//!
//! A source and a destination image are annotated with index-aligned feature lines. The engine
//! interpolates those lines over `N` in-between frames, warps both images onto each interpolated
//! set with the Beier–Neely multiple-line-pair field, cross-dissolves the two warps and hands
//! every frame to an export sink:
//!
//! - Build a [`LinePairing`] (directly or through the [`LineEditor`])
//! - Wrap both images and the lines in a validated [`MorphJob`]
//! - Drive it with [`run_morph`] into an [`ExportSink`] and read the [`MorphReport`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Morphing primitives: line pairing, line editor, interpolation.
pub mod geometry;
/// Image buffers, sampling, fitting and codecs.
pub mod raster;
/// Beier–Neely warp.
pub mod warp;
/// Cross-dissolve compositing.
pub mod composite;
pub mod pipeline;
pub mod config;

pub use crate::foundation::core::{
    Canvas, FrameIndex, MAX_FRAMES, MIN_FRAMES, Placement, Point, Rgba8, Vec2, WHITE,
    check_frame_count,
};
pub use crate::foundation::error::{MorphError, MorphResult};

pub use crate::composite::dissolve::{cross_dissolve, dissolve_frame, dissolve_weights, pad_center};
pub use crate::config::MorphSpec;
pub use crate::geometry::editor::{EditorState, LineEditor, Side, nearest_endpoint};
pub use crate::geometry::interpolate::interpolate_lines;
pub use crate::geometry::line::{Endpoint, FeatureLine, LinePairing};
pub use crate::pipeline::cancel::CancelToken;
pub use crate::pipeline::export::{ExportSink, InMemorySink, PngDirSink, artifact_name};
pub use crate::pipeline::job::{MorphInput, MorphJob};
pub use crate::pipeline::progress::{
    ChannelProgress, NoProgress, ProgressEvent, ProgressSink, ProgressTracker, TracingProgress,
    total_steps,
};
pub use crate::pipeline::report::{
    FailureKind, FrameFailure, FrameOutcome, FrameResult, JobStatus, MorphReport,
};
pub use crate::pipeline::runner::{MorphThreading, PipelineOpts, morph_frame, run_morph};
pub use crate::raster::codec::{decode_image, encode_png, open_image, save_png};
pub use crate::raster::fit::{fit_center, fit_placement};
pub use crate::raster::image::{ImageRGBA, PixelFormat};
pub use crate::raster::sample::sample_bilinear;
pub use crate::warp::backend::{
    BackendKind, BackendSettings, PixelKernel, RasterBackend, create_backend,
};
pub use crate::warp::engine::{WarpSpec, warp_image};
pub use crate::warp::field::{DisplacementField, WarpParams};
