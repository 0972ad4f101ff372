/// Pluggable parallel-for over output pixels.
pub mod backend;
/// Multiple-line-pair warp driver.
pub mod engine;
/// Weighted displacement field (per-line local frames).
pub mod field;
