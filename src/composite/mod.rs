/// Centered padding and cross-dissolve.
pub mod dissolve;
