//! vidanno - frame-by-frame annotation of images and videos
//!
//! The editing model (annotations, commands, undo/redo, hit testing, tracking
//! and detection seams) lives in `vidanno_core`. This crate adds what a host
//! application needs around it: frame sources, per-frame annotation files,
//! an editing session, background batch jobs, export and configuration.

pub mod batch;
pub mod cli;
pub mod config;
pub mod export;
pub mod format;
pub mod frames;
pub mod provider;
pub mod session;

pub use batch::{CancelToken, JobContext, JobError, JobHandle, JobSummary, Progress, spawn_job};
pub use config::{AppConfig, ConfigError, LogLevel, UserPreferences};
pub use export::{ExportError, ExportSink, ImageFolderSink};
pub use format::{AnnotationDir, StorageError};
pub use frames::{FrameCursor, FrameError, FrameSource, MemorySource, open_source};
pub use provider::ProviderRegistry;
pub use session::{AnnotationSession, SessionError};
pub use vidanno_core;
