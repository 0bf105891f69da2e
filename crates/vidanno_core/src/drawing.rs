//! Interactive drawing gesture: press, drag, release.

use crate::annotation::{Annotation, AnnotationKind, AnnotationStyle};
use crate::geometry::{is_small_drag, Point};
use crate::viewport::ViewportState;

/// State for an annotation currently being drawn.
///
/// The in-progress annotation holds raw (unsorted) corners so it can be
/// previewed while dragging in any direction. Corners are sorted only when
/// the gesture finishes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DrawingState {
    /// Not currently drawing anything.
    #[default]
    Idle,
    /// A drag is in progress.
    Drawing {
        /// The annotation as it would look if released now
        annotation: Annotation,
    },
}

impl DrawingState {
    /// Check if we're currently drawing something.
    pub fn is_drawing(&self) -> bool {
        !matches!(self, DrawingState::Idle)
    }

    /// The in-progress annotation, for preview rendering.
    pub fn preview(&self) -> Option<&Annotation> {
        match self {
            DrawingState::Idle => None,
            DrawingState::Drawing { annotation } => Some(annotation),
        }
    }

    /// Start a gesture at a screen position. Any previous gesture is dropped.
    pub fn begin(
        &mut self,
        kind: AnnotationKind,
        pointer: Point,
        viewport: &ViewportState,
        style: AnnotationStyle,
    ) {
        let p = viewport.to_normalized(pointer);
        *self = DrawingState::Drawing {
            annotation: Annotation::new(kind, p.x, p.y, p.x, p.y).with_style(style),
        };
    }

    /// Move the free corner to a screen position.
    pub fn update(&mut self, pointer: Point, viewport: &ViewportState) {
        if let DrawingState::Drawing { annotation } = self {
            let p = viewport.to_normalized(pointer);
            annotation.x2 = p.x;
            annotation.y2 = p.y;
        }
    }

    /// Release at a screen position.
    ///
    /// Returns the finalized annotation, or `None` if nothing was being drawn
    /// or a non-point shape spans less than the minimum drag diagonal on
    /// screen. Empty `text` is not stored. The state returns to `Idle` either
    /// way.
    pub fn finish(
        &mut self,
        pointer: Point,
        viewport: &ViewportState,
        text: Option<String>,
    ) -> Option<Annotation> {
        self.update(pointer, viewport);
        let DrawingState::Drawing { mut annotation } = std::mem::take(self) else {
            return None;
        };

        if annotation.kind != AnnotationKind::Point {
            let start = viewport.to_screen(Point::new(annotation.x, annotation.y));
            let end = viewport.to_screen(Point::new(annotation.x2, annotation.y2));
            if is_small_drag(start, end) {
                log::debug!("✏️ Discarded {} smaller than the minimum drag", annotation.kind);
                return None;
            }
        }

        annotation.finalize();
        annotation.text = text.filter(|t| !t.is_empty());
        Some(annotation)
    }

    /// Abort the gesture without producing anything.
    pub fn cancel(&mut self) {
        *self = DrawingState::Idle;
    }
}
