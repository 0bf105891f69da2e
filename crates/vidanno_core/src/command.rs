//! Reversible store mutations.
//!
//! Every change to an [`AnnotationStore`] goes through a [`Command`]. A command
//! records what it needs to reverse itself while executing (resolved index,
//! removed values, the previous value of a modified slot), so that `undo`
//! restores the exact prior list, order included.

use crate::annotation::Annotation;
use crate::error::{AnnotationError, Result};
use crate::store::AnnotationStore;

// ============================================================================
// Command Types
// ============================================================================

/// A mutation that can be executed, undone and executed again (redo).
///
/// Construct with the helper constructors; the captured fields start empty and
/// are filled in by [`Command::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert one annotation at an index, or append.
    AddOne {
        /// Requested position (`None` appends)
        index: Option<usize>,
        /// The annotation to insert
        annotation: Annotation,
        /// Position actually used (captured)
        applied: Option<usize>,
    },
    /// Remove one annotation at an index, or the last one.
    DeleteOne {
        /// Requested position (`None` removes the last)
        index: Option<usize>,
        /// Resolved position and removed value (captured)
        removed: Option<(usize, Annotation)>,
    },
    /// Remove every annotation.
    DeleteAll {
        /// Full snapshot of the store before clearing (captured)
        removed: Vec<Annotation>,
    },
    /// Insert several annotations at once, as one undo step.
    BatchAdd {
        /// Requested position (`None` appends)
        index: Option<usize>,
        /// The annotations to insert, in order
        annotations: Vec<Annotation>,
        /// Position of the first inserted item (captured)
        applied: Option<usize>,
    },
    /// Remove `count` contiguous annotations, as one undo step.
    BatchDelete {
        /// Requested start (`None` removes the last `count`)
        index: Option<usize>,
        /// Number of annotations to remove
        count: usize,
        /// Resolved start and removed slice (captured)
        removed: Option<(usize, Vec<Annotation>)>,
    },
    /// Replace the annotation at an index.
    ModifyOne {
        /// Position to replace
        index: usize,
        /// Replacement value
        new_value: Annotation,
        /// Value before the replacement (captured)
        old_value: Option<Annotation>,
    },
}

impl Command {
    pub fn add(annotation: Annotation, index: Option<usize>) -> Self {
        Command::AddOne {
            index,
            annotation,
            applied: None,
        }
    }

    pub fn delete(index: Option<usize>) -> Self {
        Command::DeleteOne {
            index,
            removed: None,
        }
    }

    pub fn delete_all() -> Self {
        Command::DeleteAll {
            removed: Vec::new(),
        }
    }

    pub fn batch_add(annotations: Vec<Annotation>, index: Option<usize>) -> Self {
        Command::BatchAdd {
            index,
            annotations,
            applied: None,
        }
    }

    pub fn batch_delete(count: usize, index: Option<usize>) -> Self {
        Command::BatchDelete {
            index,
            count,
            removed: None,
        }
    }

    pub fn modify(index: usize, new_value: Annotation) -> Self {
        Command::ModifyOne {
            index,
            new_value,
            old_value: None,
        }
    }

    /// Get a human-readable description of this command
    pub fn description(&self) -> String {
        match self {
            Command::AddOne { annotation, .. } => format!("Add {}", annotation.kind),
            Command::DeleteOne { removed, .. } => match removed {
                Some((_, annotation)) => format!("Delete {}", annotation.kind),
                None => "Delete annotation".to_string(),
            },
            Command::DeleteAll { removed } => format!("Clear {} annotations", removed.len()),
            Command::BatchAdd { annotations, .. } => {
                format!("Add {} annotations", annotations.len())
            }
            Command::BatchDelete { count, .. } => format!("Delete {} annotations", count),
            Command::ModifyOne { .. } => "Modify annotation".to_string(),
        }
    }

    /// Apply the mutation, capturing what `undo` will need.
    ///
    /// Requested (not captured) positions are used, so running `execute` again
    /// on the same list state produces the same result. On error the store is
    /// untouched.
    pub fn execute(&mut self, store: &mut AnnotationStore) -> Result<()> {
        match self {
            Command::AddOne {
                index,
                annotation,
                applied,
            } => {
                *applied = Some(store.add(annotation.clone(), *index)?);
            }
            Command::DeleteOne { index, removed } => {
                let at = match *index {
                    Some(i) => i,
                    None => store
                        .len()
                        .checked_sub(1)
                        .ok_or_else(|| AnnotationError::out_of_range(0, 0))?,
                };
                let annotation = store.remove(Some(at))?;
                *removed = Some((at, annotation));
            }
            Command::DeleteAll { removed } => {
                *removed = store.remove_all();
            }
            Command::BatchAdd {
                index,
                annotations,
                applied,
            } => {
                *applied = Some(store.batch_add(annotations.clone(), *index)?);
            }
            Command::BatchDelete {
                index,
                count,
                removed,
            } => {
                let len = store.len();
                let start = match *index {
                    Some(i) => i,
                    None => len.checked_sub(*count).ok_or(AnnotationError::InvalidBatch {
                        index: 0,
                        count: *count,
                        len,
                    })?,
                };
                let items = store.batch_remove(*count, Some(start))?;
                *removed = Some((start, items));
            }
            Command::ModifyOne {
                index,
                new_value,
                old_value,
            } => {
                *old_value = Some(store.set(*index, new_value.clone())?);
            }
        }
        Ok(())
    }

    /// Reverse a previous `execute`, restoring the exact prior list.
    pub fn undo(&self, store: &mut AnnotationStore) -> Result<()> {
        match self {
            Command::AddOne { applied, .. } => {
                let at = applied.ok_or_else(|| self.not_executed())?;
                store.remove(Some(at))?;
            }
            Command::DeleteOne { removed, .. } => {
                let (at, annotation) = removed.as_ref().ok_or_else(|| self.not_executed())?;
                store.add(annotation.clone(), Some(*at))?;
            }
            Command::DeleteAll { removed } => {
                store.batch_add(removed.clone(), Some(0))?;
            }
            Command::BatchAdd {
                annotations,
                applied,
                ..
            } => {
                let at = applied.ok_or_else(|| self.not_executed())?;
                store.batch_remove(annotations.len(), Some(at))?;
            }
            Command::BatchDelete { removed, .. } => {
                let (at, items) = removed.as_ref().ok_or_else(|| self.not_executed())?;
                store.batch_add(items.clone(), Some(*at))?;
            }
            Command::ModifyOne {
                index, old_value, ..
            } => {
                let old = old_value.as_ref().ok_or_else(|| self.not_executed())?;
                store.set(*index, old.clone())?;
            }
        }
        Ok(())
    }

    fn not_executed(&self) -> AnnotationError {
        AnnotationError::NotExecuted(self.description())
    }
}
