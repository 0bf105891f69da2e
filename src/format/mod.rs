//! Annotation persistence.
//!
//! Annotations are stored per frame as plain JSON files next to the source:
//!
//! ```text
//! videos/
//!   clip.mp4
//!   clip_annotations/
//!     00000000.json
//!     00000001.json
//! ```
//!
//! Each file is the complete list for its frame and is rewritten wholesale
//! after every committed change.

mod error;
mod frame_store;

#[cfg(test)]
mod tests;

pub use error::StorageError;
pub use frame_store::{ANNOTATION_DIR_SUFFIX, AnnotationDir};
