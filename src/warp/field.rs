use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{MorphError, MorphResult};
use crate::foundation::math::{LENGTH_EPSILON, perp};
use crate::geometry::line::FeatureLine;

/// Weight falloff constants: `weight = (len^p / (a + dist))^b`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WarpParams {
    /// Added to the distance; bounds the influence of lines very close to a pixel. Must be > 0.
    pub a: f64,
    /// Falloff exponent. Must be >= 0.
    pub b: f64,
    /// Length exponent; `0` gives every line equal influence.
    pub p: f64,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 2.0,
            p: 0.0,
        }
    }
}

impl WarpParams {
    /// Reject non-finite values, `a <= 0` and `b < 0`.
    pub fn validate(&self) -> MorphResult<()> {
        if !(self.a.is_finite() && self.b.is_finite() && self.p.is_finite()) {
            return Err(MorphError::invalid("warp weights a, b, p must be finite"));
        }
        if self.a <= 0.0 {
            return Err(MorphError::invalid(format!(
                "warp weight 'a' must be > 0, got {}",
                self.a
            )));
        }
        if self.b < 0.0 {
            return Err(MorphError::invalid(format!(
                "warp weight 'b' must be >= 0, got {}",
                self.b
            )));
        }
        Ok(())
    }
}

/// One target/source line pair with everything the per-pixel loop needs precomputed.
#[derive(Clone, Copy, Debug)]
struct LineFrame {
    p: Point,
    q: Point,
    pq: Vec2,
    pq_perp: Vec2,
    len: f64,
    len_sq: f64,
    len_weight: f64,
    src_p: Point,
    src_pq: Vec2,
    src_perp_unit: Vec2,
}

/// Inverse mapping from target geometry back into a source image.
///
/// For every target point `X` the field returns `X + D`, where `D` is the weighted average of
/// the displacements implied by each line pair.
#[derive(Clone, Debug)]
pub struct DisplacementField {
    frames: Vec<LineFrame>,
    params: WarpParams,
}

impl DisplacementField {
    /// Precompute the field mapping `target` lines onto `source` lines.
    ///
    /// Source lines must be non-degenerate. Degenerate target lines are kept but contribute no
    /// weight (interpolated lines can collapse when a line flips direction between images).
    pub fn new(
        source: &[FeatureLine],
        target: &[FeatureLine],
        params: WarpParams,
    ) -> MorphResult<Self> {
        params.validate()?;
        if source.len() != target.len() {
            return Err(MorphError::invalid(format!(
                "warp needs index-aligned lines: {} source vs {} target",
                source.len(),
                target.len()
            )));
        }
        if source.is_empty() {
            return Err(MorphError::invalid("warp needs at least one line pair"));
        }

        let mut frames = Vec::with_capacity(source.len());
        for (i, (s, t)) in source.iter().zip(target.iter()).enumerate() {
            s.validate()
                .map_err(|e| MorphError::invalid(format!("warp source line {i}: {e}")))?;
            let src_pq = s.vector();
            let src_len = src_pq.hypot();

            let pq = t.vector();
            let len = pq.hypot();
            if !(len > LENGTH_EPSILON) {
                tracing::debug!(line = i, "degenerate target line gets zero weight");
                continue;
            }
            frames.push(LineFrame {
                p: t.start,
                q: t.end,
                pq,
                pq_perp: perp(pq),
                len,
                len_sq: len * len,
                len_weight: len.powf(params.p),
                src_p: s.start,
                src_pq,
                src_perp_unit: perp(src_pq) / src_len,
            });
        }

        Ok(Self { frames, params })
    }

    /// Weighted displacement `D` at target point `x`.
    pub fn displacement(&self, x: Point) -> Vec2 {
        let mut sum = Vec2::ZERO;
        let mut weight_sum = 0.0;

        for f in &self.frames {
            let px = x - f.p;
            let u = px.dot(f.pq) / f.len_sq;
            let v = px.dot(f.pq_perp) / f.len;

            let mapped = f.src_p + f.src_pq * u + f.src_perp_unit * v;
            let d = mapped - x;

            let dist = if u < 0.0 {
                px.hypot()
            } else if u > 1.0 {
                (x - f.q).hypot()
            } else {
                v.abs()
            };

            let weight = (f.len_weight / (self.params.a + dist)).powf(self.params.b);
            sum += d * weight;
            weight_sum += weight;
        }

        if weight_sum > 0.0 && weight_sum.is_finite() {
            sum / weight_sum
        } else {
            Vec2::ZERO
        }
    }

    /// Source-space point corresponding to target point `x`.
    pub fn source_point(&self, x: Point) -> Point {
        x + self.displacement(x)
    }

    /// Number of line pairs that carry weight.
    pub fn active_lines(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/warp/field.rs"]
mod tests;
