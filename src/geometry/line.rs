use crate::foundation::core::{Point, Vec2};
use crate::foundation::error::{MorphError, MorphResult};
use crate::foundation::math::LENGTH_EPSILON;

/// Which end of a [`FeatureLine`] is meant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Endpoint {
    /// The point the line was drawn from.
    Start,
    /// The point the line was drawn to.
    End,
}

/// Directed segment marking a feature on an image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FeatureLine {
    /// Start point in view coordinates.
    pub start: Point,
    /// End point in view coordinates.
    pub end: Point,
}

impl FeatureLine {
    /// Create a line from two points. No validation happens here; see [`FeatureLine::validate`].
    pub fn new(start: impl Into<Point>, end: impl Into<Point>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Vector from start to end.
    pub fn vector(&self) -> Vec2 {
        self.end - self.start
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        self.vector().hypot()
    }

    /// Return `true` for zero-length (or non-finite) segments.
    pub fn is_degenerate(&self) -> bool {
        let len = self.length();
        !len.is_finite() || len <= LENGTH_EPSILON
    }

    /// Reject degenerate lines.
    pub fn validate(&self) -> MorphResult<()> {
        if self.is_degenerate() {
            return Err(MorphError::invalid(format!(
                "feature line ({}, {}) -> ({}, {}) has zero length",
                self.start.x, self.start.y, self.end.x, self.end.y
            )));
        }
        Ok(())
    }

    /// Borrow one endpoint.
    pub fn point(&self, which: Endpoint) -> Point {
        match which {
            Endpoint::Start => self.start,
            Endpoint::End => self.end,
        }
    }

    /// Replace one endpoint.
    pub fn set_point(&mut self, which: Endpoint, p: Point) {
        match which {
            Endpoint::Start => self.start = p,
            Endpoint::End => self.end = p,
        }
    }
}

/// Index-aligned source/destination line correspondences.
///
/// Index `i` of `source` corresponds to index `i` of `destination`; the order is never changed
/// after construction.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LinePairing {
    source: Vec<FeatureLine>,
    destination: Vec<FeatureLine>,
}

impl LinePairing {
    /// Validate and build a pairing.
    ///
    /// Both sides must have the same non-zero length and contain no degenerate lines.
    pub fn new(source: Vec<FeatureLine>, destination: Vec<FeatureLine>) -> MorphResult<Self> {
        if source.len() != destination.len() {
            return Err(MorphError::invalid(format!(
                "line pairing cardinality mismatch: {} source lines vs {} destination lines",
                source.len(),
                destination.len()
            )));
        }
        if source.is_empty() {
            return Err(MorphError::invalid(
                "line pairing must contain at least one line",
            ));
        }
        for (i, (s, d)) in source.iter().zip(destination.iter()).enumerate() {
            s.validate()
                .map_err(|e| MorphError::invalid(format!("source line {i}: {e}")))?;
            d.validate()
                .map_err(|e| MorphError::invalid(format!("destination line {i}: {e}")))?;
        }
        Ok(Self {
            source,
            destination,
        })
    }

    /// Build a pairing from `(source, destination)` tuples.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (FeatureLine, FeatureLine)>,
    ) -> MorphResult<Self> {
        let (source, destination) = pairs.into_iter().unzip();
        Self::new(source, destination)
    }

    /// Source-side lines.
    pub fn source(&self) -> &[FeatureLine] {
        &self.source
    }

    /// Destination-side lines.
    pub fn destination(&self) -> &[FeatureLine] {
        &self.destination
    }

    /// Number of correspondences (always >= 1).
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Always `false`; present for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Iterate over `(source, destination)` pairs in index order.
    pub fn pairs(&self) -> impl Iterator<Item = (&FeatureLine, &FeatureLine)> {
        self.source.iter().zip(self.destination.iter())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/line.rs"]
mod tests;
