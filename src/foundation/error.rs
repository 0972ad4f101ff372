use crate::foundation::core::FrameIndex;

/// Convenience result alias used throughout the crate.
pub type MorphResult<T> = Result<T, MorphError>;

/// Every failure the morphing engine and its host collaborators can report.
#[derive(thiserror::Error, Debug)]
pub enum MorphError {
    /// Rejected input: bad line pairing, frame count, weights or buffer shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The export sink failed to persist one frame.
    #[error("export error (frame {index}): {message}")]
    Export {
        /// Frame slot the export was meant for.
        index: FrameIndex,
        /// Human-readable cause.
        message: String,
    },

    /// A worker did not report completion in time, or died before reporting.
    #[error("concurrency error: {0}")]
    Concurrency(String),

    /// The job was cancelled before it completed.
    #[error("morph cancelled")]
    Cancelled,

    /// An image could not be decoded or encoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Context-wrapped host error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MorphError {
    /// Build an [`MorphError::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build an [`MorphError::Export`] for frame `index`.
    pub fn export(index: FrameIndex, msg: impl Into<String>) -> Self {
        Self::Export {
            index,
            message: msg.into(),
        }
    }

    /// Build an [`MorphError::Concurrency`].
    pub fn concurrency(msg: impl Into<String>) -> Self {
        Self::Concurrency(msg.into())
    }

    /// Build an [`MorphError::Codec`].
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }

    /// Return `true` for [`MorphError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
