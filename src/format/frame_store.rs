//! One JSON file of annotations per frame.
//!
//! Layout: `<annotation_dir>/<index:08>.json`, each a pretty-printed JSON
//! array of annotation objects. A missing file means "no annotations yet",
//! which is different from an existing empty array only for propagation (an
//! empty frame of either kind may be filled by tracking).

use std::fs;
use std::path::{Path, PathBuf};

use vidanno_core::Annotation;

use super::error::StorageError;

/// Suffix appended to the source stem to name its annotation directory.
pub const ANNOTATION_DIR_SUFFIX: &str = "_annotations";

/// Directory holding the per-frame annotation files of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationDir {
    root: PathBuf,
}

impl AnnotationDir {
    /// Use `root` as the annotation directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The annotation directory of a source file or folder:
    /// `foo/bar.mp4` → `foo/bar_annotations`.
    pub fn for_source(source: &Path) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        Self::new(parent.join(format!("{}{}", stem, ANNOTATION_DIR_SUFFIX)))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Create the directory (and parents) if needed.
    pub fn create(&self) -> Result<(), StorageError> {
        if self.root.exists() && !self.root.is_dir() {
            return Err(StorageError::NotADirectory {
                path: self.root.clone(),
            });
        }
        fs::create_dir_all(&self.root).map_err(|e| StorageError::io(&self.root, e))
    }

    /// Path of the file for frame `index`.
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("{:08}.json", index))
    }

    /// Whether frame `index` has a file.
    pub fn has_frame(&self, index: usize) -> bool {
        self.frame_path(index).is_file()
    }

    /// Load the annotations of frame `index`. A missing file is an empty list.
    pub fn load(&self, index: usize) -> Result<Vec<Annotation>, StorageError> {
        let path = self.frame_path(index);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        let annotations: Vec<Annotation> =
            serde_json::from_str(&json).map_err(|e| StorageError::json(&path, e))?;
        log::debug!("📂 Loaded {} annotations from {:?}", annotations.len(), path);
        Ok(annotations)
    }

    /// Replace the file of frame `index` with `annotations`.
    ///
    /// The JSON is written to a temporary file in the same directory and
    /// renamed over the target, so readers never see a partial file.
    pub fn save(&self, index: usize, annotations: &[Annotation]) -> Result<(), StorageError> {
        let path = self.frame_path(index);
        let json = serde_json::to_string_pretty(annotations).map_err(|e| StorageError::json(&path, e))?;

        let tmp = self.root.join(format!(".{:08}.json.tmp", index));
        fs::write(&tmp, json).map_err(|e| StorageError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::io(&path, e));
        }
        log::debug!("💾 Saved {} annotations to {:?}", annotations.len(), path);
        Ok(())
    }

    /// Append one annotation to frame `index`. Returns the new count.
    pub fn append(&self, index: usize, annotation: &Annotation) -> Result<usize, StorageError> {
        let mut annotations = self.load(index)?;
        annotations.push(annotation.clone());
        self.save(index, &annotations)?;
        Ok(annotations.len())
    }

    /// Write an empty list for frame `index`.
    pub fn clear(&self, index: usize) -> Result<(), StorageError> {
        self.save(index, &[])
    }

    /// Indices of all frames that have a file, ascending.
    pub fn frames(&self) -> Result<Vec<usize>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e)),
        };
        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(index) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<usize>().ok())
            {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }
}
