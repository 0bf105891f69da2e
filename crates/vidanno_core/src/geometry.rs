//! Coordinate mapping and shape geometry.
//!
//! Three coordinate spaces are in play:
//! - **normalized**: fractions of the source image, `0.0..=1.0`
//! - **screen**: pixels of the widget that shows the visible [`ViewportRegion`]
//! - **frame pixels**: pixels of a decoded frame (used only for tracking)
//!
//! Everything here is pure and stateless.

use crate::annotation::{Annotation, AnnotationKind};
use crate::viewport::ViewportRegion;

/// Drawn shapes with a smaller screen diagonal than this are discarded.
pub const MIN_DRAG_DIAGONAL: f64 = 5.0;

/// Side length (frame pixels) of the box tracked around a point annotation.
pub const POINT_TRACK_BOX: f64 = 30.0;

/// A 2D point. The coordinate space depends on the call site.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(*self, *other)
    }
}

/// Pixel dimensions of a widget or a frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size of an image with integer dimensions.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }

    /// True when either side is zero (or negative), i.e. nothing can be mapped.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An axis-aligned box in frame pixels, `(x, y, width, height)`.
///
/// This is the box format exchanged with trackers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanning two corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (a.x - b.x).abs(),
            (a.y - b.y).abs(),
        )
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Check if a point is inside the box (edges included).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    /// Zero-area (or inverted) boxes cannot be tracked.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Euclidean distance.
pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Map a screen position inside the viewport widget to normalized image
/// coordinates, clamped to the image.
pub fn to_normalized(screen: Point, viewport: Size, region: &ViewportRegion) -> Point {
    if viewport.is_empty() {
        return Point::new(region.x, region.y);
    }
    let x = (screen.x / viewport.width) * region.w + region.x;
    let y = (screen.y / viewport.height) * region.h + region.y;
    Point::new(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
}

/// Map normalized image coordinates to a screen position in the viewport
/// widget. Points outside the visible region map outside the widget.
pub fn to_screen(norm: Point, viewport: Size, region: &ViewportRegion) -> Point {
    Point::new(
        (norm.x - region.x) / region.w * viewport.width,
        (norm.y - region.y) / region.h * viewport.height,
    )
}

/// Scale a normalized point to frame pixels.
pub fn to_pixels(norm: Point, frame: Size) -> Point {
    Point::new(norm.x * frame.width, norm.y * frame.height)
}

/// Scale a frame-pixel point to normalized coordinates (not clamped).
pub fn from_pixels(px: Point, frame: Size) -> Point {
    if frame.is_empty() {
        return Point::default();
    }
    Point::new(px.x / frame.width, px.y / frame.height)
}

/// Derive the frame-pixel box a tracker should follow for an annotation.
///
/// - Rectangle/Text: the stored corners
/// - Circle: the bounding box of center ± radius, radius measured in pixels
///   between the two stored points
/// - Point: a fixed [`POINT_TRACK_BOX`] square centered on the point
pub fn derive_box(annotation: &Annotation, frame: Size) -> PixelBox {
    match annotation.kind {
        AnnotationKind::Rectangle | AnnotationKind::Text => PixelBox::from_corners(
            to_pixels(Point::new(annotation.x, annotation.y), frame),
            to_pixels(Point::new(annotation.x2, annotation.y2), frame),
        ),
        AnnotationKind::Circle => {
            let center = to_pixels(Point::new(annotation.x, annotation.y), frame);
            let rim = to_pixels(Point::new(annotation.x2, annotation.y2), frame);
            let r = distance(center, rim);
            PixelBox::new(center.x - r, center.y - r, 2.0 * r, 2.0 * r)
        }
        AnnotationKind::Point => {
            let p = to_pixels(Point::new(annotation.x2, annotation.y2), frame);
            let half = POINT_TRACK_BOX / 2.0;
            PixelBox::new(p.x - half, p.y - half, POINT_TRACK_BOX, POINT_TRACK_BOX)
        }
    }
}

/// True if a drag between two screen positions is too short to be intentional.
pub fn is_small_drag(start: Point, end: Point) -> bool {
    distance(start, end) < MIN_DRAG_DIAGONAL
}
