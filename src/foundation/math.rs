use crate::foundation::core::Vec2;

/// Geometric tolerance under which a segment is treated as having zero length.
pub(crate) const LENGTH_EPSILON: f64 = 1e-9;

/// Perpendicular of `v`: `(dx, dy) -> (-dy, dx)`.
pub(crate) fn perp(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Round a float channel value and saturate it into `u8`.
pub(crate) fn quantize_u8(v: f64) -> u8 {
    if v.is_nan() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
