//! Annotation session: one frame source, its annotation directory and the
//! editing state of the frame currently shown.
//!
//! The session owns the [`CommandEngine`] for the current frame. Every
//! committed change is written to that frame's file before the call returns.

use std::path::Path;
use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;
use vidanno_core::error::{AnnotationError, DetectError};
use vidanno_core::hit_test::find_nearest;
use vidanno_core::{
    Annotation, AnnotationKind, Command, CommandEngine, DrawingState, Point, Size,
    StoreEvent, StoreObserver, TrackPropagator, TrackerFactory, ViewportState, run_detector,
};

use crate::config::UserPreferences;
use crate::format::{AnnotationDir, StorageError};
use crate::frames::{FrameCursor, FrameError, FrameSource, open_source};
use crate::provider::ProviderRegistry;

/// Errors surfaced by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error("The source has no frames")]
    NoSource,

    #[error("Unknown {kind} '{name}'")]
    UnknownProvider {
        /// "detector" or "tracker"
        kind: &'static str,
        name: String,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Editing session over a frame source.
pub struct AnnotationSession {
    source: Arc<dyn FrameSource>,
    dir: AnnotationDir,
    cursor: FrameCursor,
    engine: CommandEngine,
    viewport: ViewportState,
    drawing: DrawingState,
    selected: Option<usize>,
    providers: ProviderRegistry,
    preferences: UserPreferences,
}

impl AnnotationSession {
    /// Open a still image or image folder. Annotations live next to it in
    /// `<stem>_annotations/`.
    pub fn open(
        path: &Path,
        preferences: UserPreferences,
        providers: ProviderRegistry,
    ) -> Result<Self> {
        let source: Arc<dyn FrameSource> = Arc::from(open_source(path)?);
        Self::with_source(source, AnnotationDir::for_source(path), preferences, providers)
    }

    /// Open a session over any frame source, e.g. frames decoded by the host.
    pub fn with_source(
        source: Arc<dyn FrameSource>,
        dir: AnnotationDir,
        preferences: UserPreferences,
        providers: ProviderRegistry,
    ) -> Result<Self> {
        if source.is_empty() {
            return Err(SessionError::NoSource);
        }
        dir.create()?;

        let first = source.frame(0)?;
        log::info!(
            "📂 Opened '{}' ({} frames), annotations in {:?}",
            source.name(),
            source.len(),
            dir.path()
        );

        let mut session = Self {
            cursor: FrameCursor::new(source.len()),
            source,
            dir,
            engine: CommandEngine::with_config(preferences.undo_config()),
            viewport: ViewportState::new(Size::from_dimensions(first.width(), first.height())),
            drawing: DrawingState::default(),
            selected: None,
            providers,
            preferences,
        };
        session.goto(0)?;
        Ok(session)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn source(&self) -> Arc<dyn FrameSource> {
        Arc::clone(&self.source)
    }

    pub fn dir(&self) -> &AnnotationDir {
        &self.dir
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn frame_index(&self) -> usize {
        self.cursor.index()
    }

    pub fn frame_count(&self) -> usize {
        self.cursor.len()
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.engine.annotations()
    }

    pub fn engine(&self) -> &CommandEngine {
        &self.engine
    }

    /// Index of the highlighted annotation, from the last [`hover`](Self::hover).
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The annotation being drawn, for preview rendering.
    pub fn preview(&self) -> Option<&Annotation> {
        self.drawing.preview()
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// Decode the current frame.
    pub fn frame_image(&self) -> Result<DynamicImage> {
        Ok(self.source.frame(self.cursor.index())?)
    }

    /// Register a store observer on the current frame's engine.
    pub fn subscribe(&mut self, observer: impl StoreObserver + 'static) {
        self.engine.subscribe(observer);
    }

    pub fn set_kind(&mut self, kind: AnnotationKind) {
        self.preferences.annotation_kind = kind;
    }

    /// Select the tracker used when navigating onto an empty frame.
    pub fn set_tracker(&mut self, name: Option<&str>) -> Result<()> {
        if let Some(name) = name {
            self.tracker_factory(name)?;
        }
        self.preferences.tracker = name.map(str::to_string);
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Show frame `index` (clamped). Returns the index actually shown.
    ///
    /// History is reset. If the frame has no annotations and a tracker is
    /// selected, the previous frame's annotations are propagated onto it and
    /// saved.
    ///
    /// On error the session stays on the frame it was showing, with its
    /// history intact.
    pub fn goto(&mut self, index: usize) -> Result<usize> {
        let index = self.cursor.clamp(index);
        let mut annotations = self.dir.load(index)?;

        if annotations.is_empty()
            && let Some(tracked) = self.auto_propagate(index)?
        {
            self.dir.save(index, &tracked)?;
            annotations = tracked;
        }

        self.cursor.set(index);

        log::info!(
            "🎞️ Frame {}/{}: {} annotations",
            index + 1,
            self.cursor.len(),
            annotations.len()
        );
        self.engine.reset(annotations);
        self.drawing.cancel();
        self.selected = None;
        Ok(index)
    }

    pub fn next_frame(&mut self) -> Result<usize> {
        self.goto(self.cursor.index().saturating_add(1))
    }

    pub fn previous_frame(&mut self) -> Result<usize> {
        self.goto(self.cursor.index().saturating_sub(1))
    }

    /// Re-read the current frame's file, e.g. after a batch job wrote it.
    pub fn reload(&mut self) -> Result<usize> {
        self.goto(self.cursor.index())
    }

    fn auto_propagate(&self, index: usize) -> Result<Option<Vec<Annotation>>> {
        let Some(name) = self.preferences.tracker.as_deref() else {
            return Ok(None);
        };
        if index == 0 || !self.dir.has_frame(index - 1) {
            return Ok(None);
        }
        let previous = self.dir.load(index - 1)?;
        if previous.is_empty() {
            return Ok(None);
        }

        let factory = self.tracker_factory(name)?;
        let tracked = self.propagate_from_previous(factory.as_ref(), &previous, index)?;
        Ok((!tracked.is_empty()).then_some(tracked))
    }

    fn propagate_from_previous(
        &self,
        factory: &dyn TrackerFactory,
        previous: &[Annotation],
        index: usize,
    ) -> Result<Vec<Annotation>> {
        let previous_frame = self.source.frame(index - 1)?;
        let current_frame = self.source.frame(index)?;
        Ok(TrackPropagator::new(factory).propagate(previous, &previous_frame, &current_frame))
    }

    fn tracker_factory(&self, name: &str) -> Result<Arc<dyn TrackerFactory>> {
        self.providers
            .tracker(name)
            .ok_or_else(|| SessionError::UnknownProvider {
                kind: "tracker",
                name: name.to_string(),
            })
    }

    // ========================================================================
    // Editing
    // ========================================================================

    fn apply(&mut self, command: Command) -> Result<StoreEvent> {
        let event = self.engine.execute(command)?;
        self.selected = None;
        self.persist()?;
        Ok(event)
    }

    fn persist(&self) -> Result<()> {
        let index = self.cursor.index();
        self.dir
            .save(index, self.engine.annotations())
            .inspect_err(|e| log::error!("💾 Failed to save frame {}: {}", index, e))?;
        Ok(())
    }

    /// Start drawing the current kind at a screen position.
    pub fn draw_begin(&mut self, pointer: Point) {
        self.drawing.begin(
            self.preferences.annotation_kind,
            pointer,
            &self.viewport,
            self.preferences.draw_style(),
        );
    }

    pub fn draw_update(&mut self, pointer: Point) {
        self.drawing.update(pointer, &self.viewport);
    }

    /// Release the drawing gesture. Adds the annotation unless the drag was
    /// too small.
    pub fn draw_finish(&mut self, pointer: Point, text: Option<String>) -> Result<Option<StoreEvent>> {
        match self.drawing.finish(pointer, &self.viewport, text) {
            Some(annotation) => self.apply(Command::add(annotation, None)).map(Some),
            None => Ok(None),
        }
    }

    pub fn draw_cancel(&mut self) {
        self.drawing.cancel();
    }

    /// Delete the annotation under a screen position, if any.
    pub fn delete_at(&mut self, pointer: Point) -> Result<Option<StoreEvent>> {
        match find_nearest(pointer, self.engine.annotations(), &self.viewport) {
            Some(index) => self.apply(Command::delete(Some(index))).map(Some),
            None => Ok(None),
        }
    }

    /// Delete every annotation on the current frame. Nothing is recorded for
    /// an empty frame.
    pub fn clear(&mut self) -> Result<Option<StoreEvent>> {
        if self.engine.annotations().is_empty() {
            return Ok(None);
        }
        self.apply(Command::delete_all()).map(Some)
    }

    pub fn modify(&mut self, index: usize, annotation: Annotation) -> Result<StoreEvent> {
        self.apply(Command::modify(index, annotation))
    }

    pub fn undo(&mut self) -> Result<Option<StoreEvent>> {
        let event = self.engine.undo()?;
        if event.is_some() {
            self.selected = None;
            self.persist()?;
        }
        Ok(event)
    }

    pub fn redo(&mut self) -> Result<Option<StoreEvent>> {
        let event = self.engine.redo()?;
        if event.is_some() {
            self.selected = None;
            self.persist()?;
        }
        Ok(event)
    }

    /// Highlight the annotation under a screen position.
    pub fn hover(&mut self, pointer: Point) -> Option<usize> {
        self.selected = find_nearest(pointer, self.engine.annotations(), &self.viewport);
        self.selected
    }

    /// Run a registered detector on the current frame and add its results as
    /// one undoable step.
    pub fn run_detector(&mut self, name: &str) -> Result<Option<StoreEvent>> {
        let detector = self
            .providers
            .detector(name)
            .ok_or_else(|| SessionError::UnknownProvider {
                kind: "detector",
                name: name.to_string(),
            })?;
        let image = self.frame_image()?;
        let annotations = run_detector(
            detector.as_ref(),
            &image,
            &self.preferences.detect_options(),
        )?;
        if annotations.is_empty() {
            log::info!("🔍 '{}' found nothing on frame {}", name, self.cursor.index());
            return Ok(None);
        }
        self.apply(Command::batch_add(annotations, None)).map(Some)
    }

    /// Track the previous frame's annotations onto the current frame and add
    /// them as one undoable step.
    pub fn run_track(&mut self, tracker: &str) -> Result<Option<StoreEvent>> {
        let factory = self.tracker_factory(tracker)?;
        let index = self.cursor.index();
        if index == 0 {
            return Ok(None);
        }
        let previous = self.dir.load(index - 1)?;
        if previous.is_empty() {
            return Ok(None);
        }
        let tracked = self.propagate_from_previous(factory.as_ref(), &previous, index)?;
        if tracked.is_empty() {
            return Ok(None);
        }
        self.apply(Command::batch_add(tracked, None)).map(Some)
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    pub fn set_viewport_size(&mut self, size: Size) {
        self.viewport.set_size(size);
    }

    pub fn zoom_at(&mut self, factor: f64, anchor: Point) {
        self.viewport.zoom_at(factor, anchor);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.viewport.pan(dx, dy);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;
    use vidanno_core::{Detection, Detector};

    use super::*;
    use crate::frames::MemorySource;

    struct OneBox;

    impl Detector for OneBox {
        fn name(&self) -> &str {
            "one-box"
        }

        fn detect(
            &self,
            _: &DynamicImage,
            _: AnnotationKind,
        ) -> std::result::Result<Vec<Detection>, DetectError> {
            Ok(vec![Detection {
                x: 0.1,
                y: 0.1,
                x2: 0.3,
                y2: 0.3,
                label: Some("15".to_string()),
                score: Some(0.9),
                text: Some("cat".to_string()),
                color: None,
            }])
        }
    }

    fn session(frames: usize) -> (tempfile::TempDir, AnnotationSession) {
        let tmp = tempfile::tempdir().unwrap();
        let images = (0..frames)
            .map(|_| DynamicImage::ImageRgb8(RgbImage::new(100, 100)))
            .collect();
        let source = Arc::new(MemorySource::new("clip", images));
        let mut providers = ProviderRegistry::new();
        providers.register_detector(Arc::new(OneBox));
        let session = AnnotationSession::with_source(
            source,
            AnnotationDir::new(tmp.path().join("clip_annotations")),
            UserPreferences::default(),
            providers,
        )
        .unwrap();
        (tmp, session)
    }

    fn drag(session: &mut AnnotationSession, from: (f64, f64), to: (f64, f64)) -> Option<StoreEvent> {
        session.draw_begin(Point::new(from.0, from.1));
        session.draw_update(Point::new((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0));
        session.draw_finish(Point::new(to.0, to.1), None).unwrap()
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let result = AnnotationSession::with_source(
            Arc::new(MemorySource::new("none", Vec::new())),
            AnnotationDir::new(tmp.path()),
            UserPreferences::default(),
            ProviderRegistry::new(),
        );
        assert!(matches!(result, Err(SessionError::NoSource)));
    }

    #[test]
    fn test_drawing_persists() {
        let (_tmp, mut session) = session(1);
        assert!(drag(&mut session, (60.0, 80.0), (10.0, 20.0)).is_some());
        let saved = session.dir().load(0).unwrap();
        assert_eq!(saved, session.annotations());
        assert_eq!((saved[0].x, saved[0].y), (0.1, 0.2));
        assert_eq!((saved[0].x2, saved[0].y2), (0.6, 0.8));
    }

    #[test]
    fn test_tiny_drag_adds_nothing() {
        let (_tmp, mut session) = session(1);
        assert!(drag(&mut session, (10.0, 10.0), (12.0, 12.0)).is_none());
        assert!(session.annotations().is_empty());
        assert!(!session.engine().can_undo());
    }

    #[test]
    fn test_delete_undo_restores_file() {
        let (_tmp, mut session) = session(1);
        drag(&mut session, (10.0, 10.0), (50.0, 50.0));
        let original = session.annotations().to_vec();

        assert!(session.delete_at(Point::new(30.0, 30.0)).unwrap().is_some());
        assert!(session.dir().load(0).unwrap().is_empty());
        assert!(session.delete_at(Point::new(90.0, 90.0)).unwrap().is_none());

        session.undo().unwrap();
        assert_eq!(session.dir().load(0).unwrap(), original);
        session.redo().unwrap();
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_clear_on_empty_frame_is_noop() {
        let (_tmp, mut session) = session(1);
        assert!(session.clear().unwrap().is_none());
        assert!(!session.engine().can_undo());
    }

    #[test]
    fn test_hover_selects_and_edits_reset_it() {
        let (_tmp, mut session) = session(1);
        drag(&mut session, (10.0, 10.0), (50.0, 50.0));
        assert_eq!(session.hover(Point::new(20.0, 20.0)), Some(0));
        assert_eq!(session.selected(), Some(0));
        session.clear().unwrap();
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn test_navigation_resets_history() {
        let (_tmp, mut session) = session(3);
        drag(&mut session, (10.0, 10.0), (50.0, 50.0));
        assert_eq!(session.next_frame().unwrap(), 1);
        assert!(session.annotations().is_empty());
        assert!(!session.engine().can_undo());
        assert_eq!(session.previous_frame().unwrap(), 0);
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.goto(99).unwrap(), 2);
    }

    #[test]
    fn test_auto_propagation_with_copy_tracker() {
        let (_tmp, mut session) = session(3);
        drag(&mut session, (25.0, 25.0), (75.0, 75.0));
        let first = session.annotations().to_vec();

        session.set_tracker(Some("copy")).unwrap();
        session.next_frame().unwrap();
        assert_eq!(session.annotations(), &first[..]);
        assert!(session.dir().has_frame(1));
        assert!(!session.engine().can_undo());
    }

    #[test]
    fn test_unknown_providers() {
        let (_tmp, mut session) = session(2);
        assert!(matches!(
            session.set_tracker(Some("kcf")),
            Err(SessionError::UnknownProvider { kind: "tracker", .. })
        ));
        assert!(matches!(
            session.run_detector("yolo"),
            Err(SessionError::UnknownProvider { kind: "detector", .. })
        ));
    }

    #[test]
    fn test_run_detector_is_one_undo_step() {
        let (_tmp, mut session) = session(1);
        let event = session.run_detector("one-box").unwrap().unwrap();
        assert_eq!(event.len, 1);
        assert_eq!(session.annotations()[0].label(), Some("cat"));
        session.undo().unwrap();
        assert!(session.dir().load(0).unwrap().is_empty());
    }

    #[test]
    fn test_run_track_on_first_frame_does_nothing() {
        let (_tmp, mut session) = session(2);
        assert!(session.run_track("copy").unwrap().is_none());
    }
}
