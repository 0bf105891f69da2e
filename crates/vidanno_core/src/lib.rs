//! vidanno_core - Annotation state engine for frame-by-frame labelling.
//!
//! This crate holds everything that must stay consistent while a user edits
//! the annotations of one frame:
//! - [`AnnotationStore`]: ordered, index-addressable annotation list
//! - [`Command`] / [`CommandEngine`]: reversible mutations with undo/redo
//! - [`ViewportState`]: pan/zoom region and pointer mapping
//! - [`hit_test::find_nearest`] and [`DrawingState`]: pointer interaction
//! - [`TrackPropagator`]: carry annotations to the next frame with a tracker
//! - [`Detector`]: turn external detections into annotations
//!
//! It does no I/O; persistence and frame decoding live in the host crate.

pub mod annotation;
pub mod command;
pub mod detect;
pub mod drawing;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hit_test;
pub mod propagate;
pub mod store;
pub mod style;
pub mod viewport;

pub use annotation::{Annotation, AnnotationKind, AnnotationStyle, Argb};
pub use command::Command;
pub use detect::{run_detector, DetectOptions, Detection, Detector};
pub use drawing::DrawingState;
pub use engine::{ChangeKind, CommandEngine, History, StoreEvent, StoreObserver, UndoConfig};
pub use error::{AnnotationError, DetectError, TrackerError};
pub use geometry::{PixelBox, Point, Size};
pub use propagate::{CopyTracker, CopyTrackerFactory, TrackPropagator, Tracker, TrackerFactory};
pub use store::AnnotationStore;
pub use style::StyleDefaults;
pub use viewport::{ViewportRegion, ViewportState};
