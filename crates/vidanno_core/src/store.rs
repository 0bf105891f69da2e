//! Ordered, index-addressable annotation storage for a single frame.
//!
//! Annotations have no identity beyond their position. Insertion order is the
//! draw order, so every operation here preserves the relative order of the
//! items it does not touch. The batch operations are exact inverses of each
//! other: `batch_add(items, Some(i))` is undone by
//! `batch_remove(items.len(), Some(i))` and vice versa.

use crate::annotation::Annotation;
use crate::error::{AnnotationError, Result};

/// Storage for annotations on a single frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(annotations: Vec<Annotation>) -> Self {
        Self { annotations }
    }

    /// Insert at `index`, or append when `None`. Returns the index used.
    pub fn add(&mut self, annotation: Annotation, index: Option<usize>) -> Result<usize> {
        let at = self.insertion_index(index)?;
        self.annotations.insert(at, annotation);
        Ok(at)
    }

    /// Remove at `index`, or pop the last annotation when `None`.
    pub fn remove(&mut self, index: Option<usize>) -> Result<Annotation> {
        let len = self.annotations.len();
        match index {
            Some(i) if i < len => Ok(self.annotations.remove(i)),
            Some(i) => Err(AnnotationError::out_of_range(i, len)),
            None => self
                .annotations
                .pop()
                .ok_or_else(|| AnnotationError::out_of_range(0, 0)),
        }
    }

    /// Splice `items` in at `index` (or append), keeping their relative order.
    /// Returns the index of the first inserted item.
    pub fn batch_add(&mut self, items: Vec<Annotation>, index: Option<usize>) -> Result<usize> {
        let at = self.insertion_index(index)?;
        self.annotations.splice(at..at, items);
        Ok(at)
    }

    /// Remove `count` contiguous annotations starting at `index`, or the last
    /// `count` when `None`. The removed items are returned in original order.
    pub fn batch_remove(&mut self, count: usize, index: Option<usize>) -> Result<Vec<Annotation>> {
        let len = self.annotations.len();
        let start = match index {
            Some(i) => i,
            None => len.checked_sub(count).ok_or(AnnotationError::InvalidBatch {
                index: 0,
                count,
                len,
            })?,
        };
        let end = start
            .checked_add(count)
            .filter(|end| *end <= len)
            .ok_or(AnnotationError::InvalidBatch {
                index: start,
                count,
                len,
            })?;
        Ok(self.annotations.drain(start..end).collect())
    }

    /// Clear the store and return everything it held.
    pub fn remove_all(&mut self) -> Vec<Annotation> {
        std::mem::take(&mut self.annotations)
    }

    /// Get an annotation by index.
    pub fn get(&self, index: usize) -> Option<&Annotation> {
        self.annotations.get(index)
    }

    /// Replace the annotation at `index`, returning the previous value.
    pub fn set(&mut self, index: usize, annotation: Annotation) -> Result<Annotation> {
        let len = self.annotations.len();
        let slot = self
            .annotations
            .get_mut(index)
            .ok_or_else(|| AnnotationError::out_of_range(index, len))?;
        Ok(std::mem::replace(slot, annotation))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn to_vec(&self) -> Vec<Annotation> {
        self.annotations.clone()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn last(&self) -> Option<&Annotation> {
        self.annotations.last()
    }

    fn insertion_index(&self, index: Option<usize>) -> Result<usize> {
        let len = self.annotations.len();
        match index {
            Some(i) if i <= len => Ok(i),
            Some(i) => Err(AnnotationError::out_of_range(i, len)),
            None => Ok(len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<Annotation> {
        (0..n)
            .map(|i| Annotation::point(i as f64 / 10.0, 0.5))
            .collect()
    }

    #[test]
    fn test_add_appends_or_inserts() {
        let mut store = AnnotationStore::new();
        let items = points(3);
        assert_eq!(store.add(items[0].clone(), None), Ok(0));
        assert_eq!(store.add(items[1].clone(), None), Ok(1));
        assert_eq!(store.add(items[2].clone(), Some(0)), Ok(0));
        assert_eq!(store.as_slice(), &[items[2].clone(), items[0].clone(), items[1].clone()]);
    }

    #[test]
    fn test_add_past_end_is_out_of_range() {
        let mut store = AnnotationStore::from_vec(points(1));
        assert_eq!(
            store.add(Annotation::point(0.0, 0.0), Some(2)),
            Err(AnnotationError::OutOfRange { index: 2, len: 1 })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove() {
        let items = points(3);
        let mut store = AnnotationStore::from_vec(items.clone());
        assert_eq!(store.remove(Some(1)), Ok(items[1].clone()));
        assert_eq!(store.remove(None), Ok(items[2].clone()));
        assert_eq!(store.remove(Some(5)), Err(AnnotationError::out_of_range(5, 1)));
        assert_eq!(store.remove(None), Ok(items[0].clone()));
        assert!(store.remove(None).is_err());
    }

    #[test]
    fn test_batch_add_preserves_order() {
        let mut store = AnnotationStore::from_vec(points(2));
        let batch = vec![Annotation::point(0.9, 0.9), Annotation::point(0.8, 0.8)];
        assert_eq!(store.batch_add(batch.clone(), Some(1)), Ok(1));
        assert_eq!(&store.as_slice()[1..3], batch.as_slice());
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_batch_add_then_remove_is_identity() {
        let original = AnnotationStore::from_vec(points(4));
        for i in 0..=4 {
            let mut store = original.clone();
            let batch = vec![Annotation::circle(0.1, 0.1, 0.2, 0.2), Annotation::point(0.3, 0.3)];
            let at = store.batch_add(batch.clone(), Some(i)).unwrap();
            let removed = store.batch_remove(batch.len(), Some(at)).unwrap();
            assert_eq!(removed, batch);
            assert_eq!(store, original);
        }
    }

    #[test]
    fn test_batch_remove_then_add_is_identity() {
        let original = AnnotationStore::from_vec(points(5));
        let mut store = original.clone();
        let removed = store.batch_remove(2, Some(1)).unwrap();
        assert_eq!(store.len(), 3);
        store.batch_add(removed, Some(1)).unwrap();
        assert_eq!(store, original);
    }

    #[test]
    fn test_batch_remove_tail() {
        let items = points(5);
        let mut store = AnnotationStore::from_vec(items.clone());
        assert_eq!(store.batch_remove(2, None), Ok(items[3..].to_vec()));
        assert!(matches!(
            store.batch_remove(4, None),
            Err(AnnotationError::InvalidBatch { count: 4, len: 3, .. })
        ));
        assert!(store.batch_remove(2, Some(2)).is_err());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_remove_all_returns_snapshot() {
        let items = points(3);
        let mut store = AnnotationStore::from_vec(items.clone());
        assert_eq!(store.remove_all(), items);
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_and_set() {
        let items = points(2);
        let mut store = AnnotationStore::from_vec(items.clone());
        let replacement = Annotation::rectangle(0.1, 0.1, 0.2, 0.2);
        assert_eq!(store.set(1, replacement.clone()), Ok(items[1].clone()));
        assert_eq!(store.get(1), Some(&replacement));
        assert!(store.get(2).is_none());
        assert!(store.set(2, replacement).is_err());
    }
}
