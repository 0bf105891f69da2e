//! Cross-frame propagation of annotations through a single-object tracker.
//!
//! For every annotation on the previous frame a fresh tracker is initialised
//! on the previous frame's pixels with the annotation's derived box, then
//! updated against the current frame. The returned box is mapped back onto the
//! annotation's geometry; kind, text and style are kept. Annotations whose
//! tracker fails are dropped without affecting the others.

use image::DynamicImage;

use crate::annotation::{Annotation, AnnotationKind};
use crate::error::TrackerError;
use crate::geometry::{derive_box, from_pixels, to_pixels, PixelBox, Point, Size};

/// A single-object tracker.
///
/// One instance follows one box. Implementations wrap an external tracking
/// algorithm; boxes are `(x, y, width, height)` in frame pixels.
pub trait Tracker {
    /// Start tracking `bbox` on `frame`.
    fn init(&mut self, frame: &DynamicImage, bbox: PixelBox) -> Result<(), TrackerError>;

    /// Locate the tracked object on `frame`. `Ok(None)` means the object was lost.
    fn update(&mut self, frame: &DynamicImage) -> Result<Option<PixelBox>, TrackerError>;
}

/// Creates trackers by name. Shared across worker threads.
pub trait TrackerFactory: Send + Sync {
    /// Provider name shown to the user.
    fn name(&self) -> &str;

    fn create(&self) -> Box<dyn Tracker>;
}

/// Tracker that reports the initial box unchanged on every frame.
#[derive(Debug, Clone, Default)]
pub struct CopyTracker {
    bbox: Option<PixelBox>,
}

impl Tracker for CopyTracker {
    fn init(&mut self, _frame: &DynamicImage, bbox: PixelBox) -> Result<(), TrackerError> {
        self.bbox = Some(bbox);
        Ok(())
    }

    fn update(&mut self, _frame: &DynamicImage) -> Result<Option<PixelBox>, TrackerError> {
        self.bbox
            .map(Some)
            .ok_or_else(|| TrackerError::Update("copy tracker was never initialised".to_string()))
    }
}

/// Factory for [`CopyTracker`], registered as `"copy"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTrackerFactory;

impl TrackerFactory for CopyTrackerFactory {
    fn name(&self) -> &str {
        "copy"
    }

    fn create(&self) -> Box<dyn Tracker> {
        Box::new(CopyTracker::default())
    }
}

/// Propagates a frame's annotations onto the next frame.
pub struct TrackPropagator<'a> {
    factory: &'a dyn TrackerFactory,
}

impl<'a> TrackPropagator<'a> {
    pub fn new(factory: &'a dyn TrackerFactory) -> Self {
        Self { factory }
    }

    /// Track every annotation of `previous` from `previous_frame` to
    /// `current_frame`. The result keeps the input order minus the
    /// annotations that could not be tracked.
    pub fn propagate(
        &self,
        previous: &[Annotation],
        previous_frame: &DynamicImage,
        current_frame: &DynamicImage,
    ) -> Vec<Annotation> {
        let prev_size = Size::from_dimensions(previous_frame.width(), previous_frame.height());
        let cur_size = Size::from_dimensions(current_frame.width(), current_frame.height());

        let tracked: Vec<Annotation> = previous
            .iter()
            .enumerate()
            .filter_map(|(i, annotation)| {
                match self.track_one(annotation, prev_size, previous_frame, current_frame) {
                    Ok(Some(bbox)) => Some(reposition(annotation, bbox, prev_size, cur_size)),
                    Ok(None) => {
                        log::debug!("🎯 Track: lost {} #{}", annotation.kind, i);
                        None
                    }
                    Err(e) => {
                        log::warn!("🎯 Track: dropping {} #{}: {}", annotation.kind, i, e);
                        None
                    }
                }
            })
            .collect();

        log::info!(
            "🎯 Tracked {}/{} annotations with '{}'",
            tracked.len(),
            previous.len(),
            self.factory.name()
        );
        tracked
    }

    fn track_one(
        &self,
        annotation: &Annotation,
        prev_size: Size,
        previous_frame: &DynamicImage,
        current_frame: &DynamicImage,
    ) -> Result<Option<PixelBox>, TrackerError> {
        let bbox = derive_box(annotation, prev_size);
        if bbox.is_degenerate() {
            return Err(TrackerError::DegenerateBox {
                width: bbox.width,
                height: bbox.height,
            });
        }
        let mut tracker = self.factory.create();
        tracker.init(previous_frame, bbox)?;
        tracker.update(current_frame)
    }
}

/// Map a tracked pixel box (on a frame of `cur_size`) back onto the geometry
/// of `annotation`, which was drawn on a frame of `prev_size`.
///
/// - Rectangle/Text: the box corners
/// - Point: the box center
/// - Circle: centered on the box, rim offset scaled to a radius of half the
///   box width
///
/// Results are clamped to the image.
pub fn reposition(annotation: &Annotation, bbox: PixelBox, prev_size: Size, cur_size: Size) -> Annotation {
    let norm = |p: Point| {
        let n = from_pixels(p, cur_size);
        Point::new(n.x.clamp(0.0, 1.0), n.y.clamp(0.0, 1.0))
    };

    let (first, second) = match annotation.kind {
        AnnotationKind::Rectangle | AnnotationKind::Text => {
            (norm(bbox.top_left()), norm(bbox.bottom_right()))
        }
        AnnotationKind::Point => {
            let c = norm(bbox.center());
            (c, c)
        }
        AnnotationKind::Circle => {
            let old_center = to_pixels(Point::new(annotation.x, annotation.y), prev_size);
            let old_rim = to_pixels(Point::new(annotation.x2, annotation.y2), prev_size);
            let old_r = old_center.distance_to(&old_rim);
            let new_r = bbox.width / 2.0;
            let scale = if old_r > 0.0 { new_r / old_r } else { 0.0 };
            let center = bbox.center();
            let rim = Point::new(
                center.x + (old_rim.x - old_center.x) * scale,
                center.y + (old_rim.y - old_center.y) * scale,
            );
            (norm(center), norm(rim))
        }
    };

    let mut moved = annotation.clone();
    moved.x = first.x;
    moved.y = first.y;
    moved.x2 = second.x;
    moved.y2 = second.y;
    moved.finalized()
}
