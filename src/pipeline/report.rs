use std::fmt;
use std::path::PathBuf;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::MorphError;

/// Category of a per-frame failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Warping or dissolving the frame failed.
    Render,
    /// The export sink rejected the frame.
    Export,
    /// The export task missed its deadline or died without reporting.
    Concurrency,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Render => "render",
            Self::Export => "export",
            Self::Concurrency => "concurrency",
        })
    }
}

/// Why one frame did not make it out.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FrameFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable cause.
    pub message: String,
}

impl FrameFailure {
    /// Classify an error raised while producing or exporting a frame.
    pub fn from_error(err: &MorphError) -> Self {
        let kind = match err {
            MorphError::Export { .. } | MorphError::Io(_) | MorphError::Codec(_) => {
                FailureKind::Export
            }
            MorphError::Concurrency(_) => FailureKind::Concurrency,
            _ => FailureKind::Render,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// Final state of one output slot.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Written; carries the location returned by the sink.
    Exported(PathBuf),
    /// Produced or exported unsuccessfully.
    Failed(FrameFailure),
    /// Never started because the job was cancelled.
    Skipped,
}

/// Outcome of the frame at `index`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FrameResult {
    /// Output slot.
    pub index: FrameIndex,
    /// What happened to it.
    pub outcome: FrameOutcome,
}

/// Overall job status.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Every frame was exported.
    Complete,
    /// Some frames failed; the rest were exported.
    Partial {
        /// Failed indices, ascending.
        failed: Vec<FrameIndex>,
    },
    /// The cancellation token fired during the run.
    Cancelled,
}

/// Per-index results of a morph job, ordered by index `0..=N+1`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct MorphReport {
    /// One entry per output slot.
    pub frames: Vec<FrameResult>,
    /// Aggregate status.
    pub status: JobStatus,
}

impl MorphReport {
    /// Assemble a report from per-index outcomes; `None` slots count as skipped.
    pub fn from_slots(slots: Vec<Option<FrameOutcome>>, cancelled: bool) -> Self {
        let frames: Vec<FrameResult> = slots
            .into_iter()
            .enumerate()
            .map(|(i, outcome)| FrameResult {
                index: FrameIndex(i as u32),
                outcome: outcome.unwrap_or(FrameOutcome::Skipped),
            })
            .collect();

        let failed: Vec<FrameIndex> = frames
            .iter()
            .filter(|r| matches!(r.outcome, FrameOutcome::Failed(_)))
            .map(|r| r.index)
            .collect();

        let status = if cancelled {
            JobStatus::Cancelled
        } else if failed.is_empty() && frames.iter().all(|r| r.is_exported()) {
            JobStatus::Complete
        } else {
            JobStatus::Partial { failed }
        };

        Self { frames, status }
    }

    /// Result of slot `index`.
    pub fn get(&self, index: FrameIndex) -> Option<&FrameResult> {
        self.frames.get(index.0 as usize)
    }

    /// Locations of every exported frame, in index order.
    pub fn exported(&self) -> impl Iterator<Item = (FrameIndex, &PathBuf)> {
        self.frames.iter().filter_map(|r| match &r.outcome {
            FrameOutcome::Exported(path) => Some((r.index, path)),
            _ => None,
        })
    }

    /// `true` when the status is [`JobStatus::Complete`].
    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }
}

impl FrameResult {
    /// `true` when the frame was exported.
    pub fn is_exported(&self) -> bool {
        matches!(self.outcome, FrameOutcome::Exported(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/report.rs"]
mod tests;
