//! Frame production: job validation, the per-frame warp/warp/dissolve loop, exports, progress
//! and cancellation.

/// Cooperative cancellation.
pub mod cancel;
/// Export sinks.
pub mod export;
/// Validated morph job.
pub mod job;
/// Progress counting and delivery.
pub mod progress;
/// Per-frame outcomes and job status.
pub mod report;
/// The frame loop.
pub mod runner;
