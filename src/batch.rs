//! Whole-video jobs: detect on every frame, copy an annotation forward,
//! track frame by frame.
//!
//! Jobs work on the frame source and the annotation files directly, never on
//! a session's in-memory store. They check a [`CancelToken`] between frames,
//! report [`Progress`] over a channel and write each frame file atomically.
//! [`spawn_job`] runs one on a named background thread.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use image::DynamicImage;
use thiserror::Error;
use vidanno_core::{Annotation, DetectOptions, Detector, TrackPropagator, TrackerFactory, run_detector};

use crate::export::ExportError;
use crate::format::{AnnotationDir, StorageError};
use crate::frames::{FrameError, FrameSource};

/// Errors that stop a job.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Failed to spawn job thread: {0}")]
    Spawn(std::io::Error),

    #[error("Job '{0}' panicked")]
    Panicked(String),
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Frames handled so far out of the job's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

/// Cancellation and progress plumbing handed to a running job.
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    cancel: CancelToken,
    progress: Option<Sender<Progress>>,
}

impl JobContext {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            progress: None,
        }
    }

    pub fn with_progress(mut self, sender: Sender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report(&self, done: usize, total: usize) {
        if let Some(tx) = &self.progress {
            // The receiver may be gone if nobody watches progress
            let _ = tx.send(Progress { done, total });
        }
    }
}

/// What a finished job did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Frames visited
    pub processed: usize,
    /// Frame files written
    pub written: usize,
    /// Frames left untouched
    pub skipped: usize,
    /// The job stopped early on request
    pub cancelled: bool,
}

impl JobSummary {
    fn log(&self, job: &str) {
        if self.cancelled {
            log::info!(
                "⏹️ {} cancelled after {} frames ({} written)",
                job,
                self.processed,
                self.written
            );
        } else {
            log::info!(
                "✅ {} finished: {} frames, {} written, {} skipped",
                job,
                self.processed,
                self.written,
                self.skipped
            );
        }
    }
}

/// Clamp a frame range to a source of `len` frames.
pub fn clamp_range(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}

/// Run `detector` on every frame from `from` to the end, replacing each
/// frame's annotations with the detections. A frame whose detection fails
/// is left as it was.
pub fn detect_all(
    source: &dyn FrameSource,
    detector: &dyn Detector,
    dir: &AnnotationDir,
    from: usize,
    options: &DetectOptions,
    ctx: &JobContext,
) -> Result<JobSummary, JobError> {
    dir.create()?;
    let range = clamp_range(from..source.len(), source.len());
    let total = range.len();
    let mut summary = JobSummary::default();

    for index in range {
        if ctx.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        let frame = source.frame(index)?;
        match run_detector(detector, &frame, options) {
            Ok(annotations) => {
                dir.save(index, &annotations)?;
                summary.written += 1;
            }
            Err(e) => {
                log::warn!("🔎 Frame {}: detection failed: {}", index, e);
                summary.skipped += 1;
            }
        }
        summary.processed += 1;
        ctx.report(summary.processed, total);
    }

    summary.log("Detect all");
    Ok(summary)
}

/// Append `annotation` to every frame file in `range`.
pub fn copy_to_all(
    dir: &AnnotationDir,
    annotation: &Annotation,
    range: Range<usize>,
    ctx: &JobContext,
) -> Result<JobSummary, JobError> {
    dir.create()?;
    let total = range.len();
    let mut summary = JobSummary::default();

    for index in range {
        if ctx.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        dir.append(index, annotation)?;
        summary.written += 1;
        summary.processed += 1;
        ctx.report(summary.processed, total);
    }

    summary.log("Copy to all");
    Ok(summary)
}

/// Propagate annotations frame by frame through `range`.
///
/// Each frame without annotations receives the tracked annotations of the
/// frame before it, so one annotated frame carries forward through the
/// whole range. Frames that already have annotations are kept and become
/// the new starting point.
pub fn track_all(
    source: &dyn FrameSource,
    factory: &dyn TrackerFactory,
    dir: &AnnotationDir,
    range: Range<usize>,
    ctx: &JobContext,
) -> Result<JobSummary, JobError> {
    dir.create()?;
    let range = clamp_range(range, source.len());
    let total = range.len();
    let propagator = TrackPropagator::new(factory);
    let mut summary = JobSummary::default();
    let mut previous_frame: Option<(usize, DynamicImage)> = None;

    for index in range {
        if ctx.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        summary.processed += 1;

        if index == 0 || !dir.load(index)?.is_empty() {
            summary.skipped += 1;
            previous_frame = None;
            ctx.report(summary.processed, total);
            continue;
        }
        let previous = dir.load(index - 1)?;
        if previous.is_empty() {
            summary.skipped += 1;
            previous_frame = None;
            ctx.report(summary.processed, total);
            continue;
        }

        let prev_image = match previous_frame.take() {
            Some((i, image)) if i == index - 1 => image,
            _ => source.frame(index - 1)?,
        };
        let current = source.frame(index)?;
        let tracked = propagator.propagate(&previous, &prev_image, &current);
        if tracked.is_empty() {
            summary.skipped += 1;
        } else {
            dir.save(index, &tracked)?;
            summary.written += 1;
        }
        previous_frame = Some((index, current));
        ctx.report(summary.processed, total);
    }

    summary.log("Track");
    Ok(summary)
}

// ============================================================================
// Background execution
// ============================================================================

/// A job running on its own thread.
pub struct JobHandle {
    name: String,
    cancel: CancelToken,
    progress: Receiver<Progress>,
    last: Option<Progress>,
    handle: JoinHandle<Result<JobSummary, JobError>>,
}

impl JobHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the job to stop after the current frame.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Latest progress report, draining any queued ones.
    pub fn progress(&mut self) -> Option<Progress> {
        while let Ok(p) = self.progress.try_recv() {
            self.last = Some(p);
        }
        self.last
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the job to end.
    pub fn join(self) -> Result<JobSummary, JobError> {
        self.handle
            .join()
            .map_err(|_| JobError::Panicked(self.name))?
    }
}

/// Run `job` on a background thread named `vidanno-<name>`.
pub fn spawn_job<F>(name: &str, job: F) -> Result<JobHandle, JobError>
where
    F: FnOnce(&JobContext) -> Result<JobSummary, JobError> + Send + 'static,
{
    let cancel = CancelToken::new();
    let (tx, rx) = mpsc::channel();
    let ctx = JobContext::new(cancel.clone()).with_progress(tx);
    let thread_name = format!("vidanno-{}", name);

    let handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            log::debug!("🧵 {} started", thread_name);
            let result = job(&ctx);
            if let Err(e) = &result {
                log::error!("🧵 {} failed: {}", thread_name, e);
            }
            result
        })
        .map_err(JobError::Spawn)?;

    Ok(JobHandle {
        name: name.to_string(),
        cancel,
        progress: rx,
        last: None,
        handle,
    })
}
