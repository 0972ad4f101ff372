use crate::foundation::core::check_frame_count;
use crate::foundation::error::MorphResult;
use crate::geometry::line::{FeatureLine, LinePairing};

/// Compute the line sets of every in-between frame.
///
/// Entry `k - 1` of the result holds the lines of frame `k` (`1..=frames`): each endpoint moves
/// `k / (frames + 1)` of the way from its source position toward its destination position.
/// Positions are not rounded.
pub fn interpolate_lines(
    pairing: &LinePairing,
    frames: u32,
) -> MorphResult<Vec<Vec<FeatureLine>>> {
    let frames = check_frame_count(frames)?;
    let denom = f64::from(frames) + 1.0;

    let mut out = Vec::with_capacity(frames as usize);
    for k in 1..=frames {
        let k = f64::from(k);
        let set = pairing
            .pairs()
            .map(|(s, d)| {
                let step_start = (d.start - s.start) / denom;
                let step_end = (d.end - s.end) / denom;
                FeatureLine {
                    start: s.start + step_start * k,
                    end: s.end + step_end * k,
                }
            })
            .collect();
        out.push(set);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/interpolate.rs"]
mod tests;
