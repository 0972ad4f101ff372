/// Line editing state machine and nearest-endpoint query.
pub mod editor;
/// Per-frame line interpolation.
pub mod interpolate;
/// Feature lines and line pairings.
pub mod line;
