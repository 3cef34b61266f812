// Error type shared by every patch operation.
//
// Each variant maps to one failure class of the engine: header/stream
// corruption, out-of-range copies, post-apply integrity failures, and
// I/O from the file entry points.

use std::collections::TryReserveError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by patch creation and application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A buffer could not be allocated.
    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// Patch header or instruction stream is malformed.
    #[error("invalid patch: {0}")]
    Format(String),

    /// Patch stream ended before all declared data was read.
    #[error("truncated patch: {0}")]
    Truncated(String),

    /// A COPY instruction reaches outside the old data.
    #[error("copy out of range: offset {offset} + length {len} exceeds old length {old_len}")]
    Range { offset: u64, len: u64, old_len: u64 },

    /// Reconstructed output length differs from the declared length.
    #[error("length mismatch: patch declares {expected} bytes, produced {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    /// Reconstructed output does not match the stored checksum.
    #[error("checksum mismatch: expected {expected:#018X}, got {actual:#018X}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    /// Caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error from a file entry point.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn truncated(msg: impl Into<String>) -> Self {
        Self::Truncated(msg.into())
    }

    /// True for the failures that indicate a corrupt or tampered patch.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Format(_)
                | Self::Truncated(_)
                | Self::Range { .. }
                | Self::LengthMismatch { .. }
                | Self::ChecksumMismatch { .. }
        )
    }
}
