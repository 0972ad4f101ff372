/// PNG and general image decoding/encoding.
pub mod codec;
/// Fit-center placement of images into views.
pub mod fit;
/// Owned RGBA8 image buffer.
pub mod image;
/// Bilinear sampling with background fallback.
pub mod sample;
