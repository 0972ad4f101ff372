//! UI-independent line editing.
//!
//! A host (touch surface, mouse handler, script) drives [`LineEditor`] through a small command
//! API. Lines are drawn on one side and mirrored onto the other side at the same coordinates,
//! where they can then be dragged into place; the editor never touches images.

use crate::foundation::core::Point;
use crate::foundation::error::{MorphError, MorphResult};
use crate::geometry::line::{Endpoint, FeatureLine, LinePairing};

/// Which image of the pair a command addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The image the morph starts from.
    Source,
    /// The image the morph ends at.
    Destination,
}

impl Side {
    /// The other side.
    pub fn opposite(self) -> Side {
        match self {
            Side::Source => Side::Destination,
            Side::Destination => Side::Source,
        }
    }
}

/// Gesture state of the editor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EditorState {
    /// No gesture in progress.
    Idle,
    /// A new line is being dragged out on `side`.
    Drawing {
        /// Side the line is drawn on.
        side: Side,
        /// Line under construction; not yet part of either set.
        draft: FeatureLine,
    },
    /// An existing endpoint is grabbed and follows [`LineEditor::update_endpoint`].
    Editing {
        /// Side the endpoint belongs to.
        side: Side,
        /// Index of the grabbed line.
        line: usize,
        /// Grabbed end of the line.
        endpoint: Endpoint,
    },
}

/// Return the endpoint closest to `p` over all `lines`.
///
/// Lines are scanned in index order, start before end; on equal distances the first match wins.
pub fn nearest_endpoint(lines: &[FeatureLine], p: Point) -> Option<(usize, Endpoint)> {
    let mut best: Option<(usize, Endpoint, f64)> = None;
    for (i, line) in lines.iter().enumerate() {
        for which in [Endpoint::Start, Endpoint::End] {
            let d2 = (line.point(which) - p).hypot2();
            match best {
                Some((_, _, best_d2)) if d2 >= best_d2 => {}
                _ => best = Some((i, which, d2)),
            }
        }
    }
    best.map(|(i, which, _)| (i, which))
}

/// Editable pair of index-aligned line sets.
#[derive(Clone, Debug)]
pub struct LineEditor {
    source: Vec<FeatureLine>,
    destination: Vec<FeatureLine>,
    selected: Option<usize>,
    state: EditorState,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    /// Create an empty editor.
    pub fn new() -> Self {
        Self {
            source: Vec::new(),
            destination: Vec::new(),
            selected: None,
            state: EditorState::Idle,
        }
    }

    /// Current gesture state.
    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Index of the selected line, if any.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Number of committed line pairs.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Return `true` when no line has been committed.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Committed lines of one side.
    pub fn lines(&self, side: Side) -> &[FeatureLine] {
        match side {
            Side::Source => &self.source,
            Side::Destination => &self.destination,
        }
    }

    fn lines_mut(&mut self, side: Side) -> &mut Vec<FeatureLine> {
        match side {
            Side::Source => &mut self.source,
            Side::Destination => &mut self.destination,
        }
    }

    /// Start drawing a new line at `p` on `side`.
    pub fn begin_line(&mut self, side: Side, p: Point) -> MorphResult<()> {
        self.require_idle("begin_line")?;
        self.state = EditorState::Drawing {
            side,
            draft: FeatureLine { start: p, end: p },
        };
        Ok(())
    }

    /// Move the active point: the draft's end while drawing, the grabbed endpoint while editing.
    pub fn update_endpoint(&mut self, p: Point) -> MorphResult<()> {
        match &mut self.state {
            EditorState::Idle => Err(MorphError::invalid(
                "update_endpoint requires a line being drawn or an endpoint being edited",
            )),
            EditorState::Drawing { draft, .. } => {
                draft.end = p;
                Ok(())
            }
            EditorState::Editing {
                side,
                line,
                endpoint,
            } => {
                let (side, line, endpoint) = (*side, *line, *endpoint);
                self.move_endpoint(side, line, endpoint, p)
            }
        }
    }

    /// Finish the current gesture.
    ///
    /// While drawing, the draft is committed to its side and a copy is appended to the opposite
    /// side; the new index is returned. A zero-length draft is discarded. While editing, the
    /// grabbed endpoint is released.
    pub fn end_line(&mut self) -> MorphResult<Option<usize>> {
        let state = std::mem::replace(&mut self.state, EditorState::Idle);
        match state {
            EditorState::Idle => Err(MorphError::invalid(
                "end_line called without an active gesture",
            )),
            EditorState::Drawing { side, draft } => {
                if draft.is_degenerate() {
                    tracing::debug!(?side, "discarding zero-length line");
                    return Ok(None);
                }
                self.lines_mut(side).push(draft);
                self.lines_mut(side.opposite()).push(draft);
                let index = self.source.len() - 1;
                tracing::debug!(index, ?side, "line committed and mirrored");
                Ok(Some(index))
            }
            EditorState::Editing { .. } => Ok(None),
        }
    }

    /// Grab the endpoint on `side` closest to `p` and select its line.
    ///
    /// Returns `None` (and stays idle) when there are no lines.
    pub fn select_nearest(&mut self, side: Side, p: Point) -> MorphResult<Option<(usize, Endpoint)>> {
        self.require_idle("select_nearest")?;
        let Some((line, endpoint)) = nearest_endpoint(self.lines(side), p) else {
            return Ok(None);
        };
        self.selected = Some(line);
        self.state = EditorState::Editing {
            side,
            line,
            endpoint,
        };
        Ok(Some((line, endpoint)))
    }

    /// Append an already-built pair of lines.
    pub fn append(&mut self, source: FeatureLine, destination: FeatureLine) -> MorphResult<usize> {
        self.require_idle("append")?;
        source.validate()?;
        destination.validate()?;
        self.source.push(source);
        self.destination.push(destination);
        Ok(self.source.len() - 1)
    }

    /// Move one endpoint of line `line` on `side` to `p`.
    pub fn move_endpoint(
        &mut self,
        side: Side,
        line: usize,
        endpoint: Endpoint,
        p: Point,
    ) -> MorphResult<()> {
        let lines = self.lines_mut(side);
        let len = lines.len();
        let target = lines.get_mut(line).ok_or_else(|| {
            MorphError::invalid(format!("line index {line} out of range (have {len})"))
        })?;
        target.set_point(endpoint, p);
        Ok(())
    }

    /// Delete line pair `index` from both sides.
    pub fn delete(&mut self, index: usize) -> MorphResult<(FeatureLine, FeatureLine)> {
        self.require_idle("delete")?;
        if index >= self.source.len() {
            return Err(MorphError::invalid(format!(
                "line index {index} out of range (have {})",
                self.source.len()
            )));
        }
        let removed = (self.source.remove(index), self.destination.remove(index));
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        Ok(removed)
    }

    /// Delete the selected line pair, if any, and clear the selection.
    pub fn delete_selected(&mut self) -> MorphResult<Option<usize>> {
        let Some(index) = self.selected else {
            return Ok(None);
        };
        self.delete(index)?;
        Ok(Some(index))
    }

    /// Validate the current lines into a [`LinePairing`].
    pub fn pairing(&self) -> MorphResult<LinePairing> {
        LinePairing::new(self.source.clone(), self.destination.clone())
    }

    /// Drop every line and return to idle.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn require_idle(&self, op: &str) -> MorphResult<()> {
        if self.state != EditorState::Idle {
            return Err(MorphError::invalid(format!(
                "{op} is not allowed while a gesture is in progress"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/editor.rs"]
mod tests;
