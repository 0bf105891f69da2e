//! Frame sources and navigation.
//!
//! A [`FrameSource`] yields decoded frames by index. Still images and folders
//! of images are decoded with the `image` crate; video containers are
//! recognised but must be decoded by the host and handed in as a
//! [`MemorySource`].

use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;

/// File extensions opened as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "jpe", "bmp", "tif", "tiff", "webp", "ico", "tga", "pnm", "ppm", "pgm",
    "qoi",
];

/// File extensions recognised as video containers.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "flv", "gif", "mov", "wmv", "rmvb", "rm", "asf", "ts", "mpeg", "mpg",
    "vob", "webm", "m4v", "3gp", "3g2", "f4v", "m2ts", "mts", "m2v",
];

/// Errors raised while opening or decoding frames.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Source not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Unsupported source {path:?}: {reason}")]
    Unsupported {
        /// The source path
        path: PathBuf,
        /// Why it cannot be opened
        reason: String,
    },

    #[error("No images in folder {0:?}")]
    Empty(PathBuf),

    #[error("Frame {index} out of range for {len} frames")]
    OutOfRange {
        /// Requested frame
        index: usize,
        /// Number of frames in the source
        len: usize,
    },

    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    #[error("Failed to decode {path:?}: {source}")]
    Decode {
        /// Image file involved
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },
}

/// A sequence of frames addressed by 0-based index.
pub trait FrameSource: Send + Sync {
    /// Number of frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode frame `index`.
    fn frame(&self, index: usize) -> Result<DynamicImage, FrameError>;

    /// Display name of the source.
    fn name(&self) -> &str;
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Whether `path` has a still-image extension.
pub fn is_image_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Whether `path` has a video-container extension.
pub fn is_video_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|e| VIDEO_EXTENSIONS.contains(&e.as_str()))
}

fn decode(path: &Path) -> Result<DynamicImage, FrameError> {
    image::open(path).map_err(|source| FrameError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Sources
// ============================================================================

/// A single still image, exposed as one frame.
#[derive(Debug, Clone)]
pub struct SingleImageSource {
    path: PathBuf,
    name: String,
}

impl SingleImageSource {
    /// Open an image file. The header is read to fail early on bad files.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FrameError> {
        let path = path.into();
        image::image_dimensions(&path).map_err(|source| FrameError::Decode {
            path: path.clone(),
            source,
        })?;
        let name = display_name(&path);
        Ok(Self { path, name })
    }
}

impl FrameSource for SingleImageSource {
    fn len(&self) -> usize {
        1
    }

    fn frame(&self, index: usize) -> Result<DynamicImage, FrameError> {
        if index != 0 {
            return Err(FrameError::OutOfRange { index, len: 1 });
        }
        decode(&self.path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A folder of still images, one frame per file, ordered by file name.
#[derive(Debug, Clone)]
pub struct ImageFolderSource {
    files: Vec<PathBuf>,
    name: String,
}

impl ImageFolderSource {
    pub fn open(folder: impl AsRef<Path>) -> Result<Self, FrameError> {
        let folder = folder.as_ref();
        let io_err = |source| FrameError::Io {
            path: folder.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(folder).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_image_file(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(FrameError::Empty(folder.to_path_buf()));
        }
        files.sort();
        log::info!("📁 Found {} images in {:?}", files.len(), folder);
        Ok(Self {
            files,
            name: display_name(folder),
        })
    }

}

impl FrameSource for ImageFolderSource {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn frame(&self, index: usize) -> Result<DynamicImage, FrameError> {
        let path = self.files.get(index).ok_or(FrameError::OutOfRange {
            index,
            len: self.files.len(),
        })?;
        decode(path)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Frames already decoded by the host (e.g. from a video decoder).
#[derive(Debug, Clone)]
pub struct MemorySource {
    frames: Vec<DynamicImage>,
    name: String,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, frames: Vec<DynamicImage>) -> Self {
        Self {
            frames,
            name: name.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Result<DynamicImage, FrameError> {
        self.frames.get(index).cloned().ok_or(FrameError::OutOfRange {
            index,
            len: self.frames.len(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Open the right source for a path: a folder of images, a still image, or
/// an error for video containers and unknown files.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>, FrameError> {
    if !path.exists() {
        return Err(FrameError::NotFound(path.to_path_buf()));
    }
    if path.is_dir() {
        return Ok(Box::new(ImageFolderSource::open(path)?));
    }
    if is_image_file(path) {
        return Ok(Box::new(SingleImageSource::open(path)?));
    }
    let reason = if is_video_file(path) {
        "video decoding is not built in; decode frames externally".to_string()
    } else {
        "unknown file type".to_string()
    };
    Err(FrameError::Unsupported {
        path: path.to_path_buf(),
        reason,
    })
}

// ============================================================================
// Navigation
// ============================================================================

/// Current frame index, always clamped into `0..len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCursor {
    index: usize,
    len: usize,
}

impl FrameCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `index` limited to the last frame.
    pub fn clamp(&self, index: usize) -> usize {
        index.min(self.len.saturating_sub(1))
    }

    /// Move to `index`, clamped. Returns the index actually selected.
    pub fn set(&mut self, index: usize) -> usize {
        self.index = self.clamp(index);
        self.index
    }

    pub fn forward(&mut self) -> usize {
        self.set(self.index.saturating_add(1))
    }

    pub fn back(&mut self) -> usize {
        self.set(self.index.saturating_sub(1))
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.len
    }
}
