//! Error types for the annotation engine.

use thiserror::Error;

/// Errors raised by store mutations and the commands that wrap them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    /// Index outside the current list bounds (or the list is empty).
    #[error("Index {index} out of range for {len} annotations")]
    OutOfRange {
        /// The requested index
        index: usize,
        /// Number of annotations at the time of the request
        len: usize,
    },

    /// A batch removal asked for more items than are available.
    #[error("Cannot remove {count} annotations starting at {index} from {len}")]
    InvalidBatch {
        /// Requested start index
        index: usize,
        /// Requested item count
        count: usize,
        /// Number of annotations at the time of the request
        len: usize,
    },

    /// `undo` was called on a command that never executed.
    #[error("Command '{0}' has not been executed")]
    NotExecuted(String),
}

impl AnnotationError {
    /// Create an out-of-range error.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }
}

/// Errors reported by an external single-object tracker.
///
/// A tracker error only ever drops the affected annotation from a propagated
/// set; it never aborts propagation of the remaining annotations.
#[derive(Error, Debug, Clone)]
pub enum TrackerError {
    /// The tracker could not be initialised on the previous frame.
    #[error("Tracker init failed: {0}")]
    Init(String),

    /// The tracker failed while updating against the current frame.
    #[error("Tracker update failed: {0}")]
    Update(String),

    /// The box handed to the tracker has no area.
    #[error("Degenerate tracking box {width}x{height}")]
    DegenerateBox {
        /// Box width in pixels
        width: f64,
        /// Box height in pixels
        height: f64,
    },
}

/// Errors reported by an external detector.
#[derive(Error, Debug, Clone)]
pub enum DetectError {
    /// The detector ran but failed.
    #[error("Detection failed: {0}")]
    Failed(String),

    /// The detector does not support the requested annotation kind.
    #[error("Detector '{detector}' cannot produce '{kind}' annotations")]
    UnsupportedKind {
        /// Detector name
        detector: String,
        /// Requested kind
        kind: String,
    },
}

/// Result alias for store and command operations.
pub type Result<T> = std::result::Result<T, AnnotationError>;
