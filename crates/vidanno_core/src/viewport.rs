//! Pan/zoom viewport state.
//!
//! The visible part of the source image is a normalized sub-rectangle, the
//! [`ViewportRegion`]. Zoom shrinks or grows that rectangle around an anchor,
//! pan slides it; both always leave it inside the image and no smaller than
//! a tenth of the image on either axis (10x zoom).

use crate::geometry::{self, Point, Size};

/// Smallest visible extent per axis (maximum zoom of 10x).
pub const MIN_EXTENT: f64 = 0.1;

/// Largest visible extent per axis (the full image).
pub const MAX_EXTENT: f64 = 1.0;

/// Visible window `[x, y, w, h]` in normalized image space.
///
/// Invariant: `0 <= x`, `0 <= y`, `x + w <= 1`, `y + h <= 1`,
/// `MIN_EXTENT <= w, h <= MAX_EXTENT`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRegion {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

fn clamp_extent(v: f64) -> f64 {
    if v.is_nan() {
        MAX_EXTENT
    } else {
        v.clamp(MIN_EXTENT, MAX_EXTENT)
    }
}

fn clamp_origin(v: f64, extent: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, MAX_EXTENT - extent)
    }
}

impl ViewportRegion {
    /// The whole image.
    pub fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        }
    }

    /// Create a region, clamped into the invariant.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }.clamped()
    }

    /// Clamp extents first, then slide the origin back inside the image.
    pub fn clamped(self) -> Self {
        let w = clamp_extent(self.w);
        let h = clamp_extent(self.h);
        Self {
            x: clamp_origin(self.x, w),
            y: clamp_origin(self.y, h),
            w,
            h,
        }
    }

    /// Current magnification along the more zoomed axis.
    pub fn zoom(&self) -> f64 {
        1.0 / self.w.min(self.h)
    }

    pub fn is_full(&self) -> bool {
        *self == Self::full()
    }

    /// Zoom by `factor` (> 1 zooms in) keeping the normalized `anchor` at the
    /// same relative position inside the region, as far as clamping allows.
    pub fn zoom_about(&self, factor: f64, anchor: Point) -> Self {
        if !factor.is_finite() || factor <= 0.0 {
            return *self;
        }
        let w = clamp_extent(self.w / factor);
        let h = clamp_extent(self.h / factor);
        let rel_x = (anchor.x - self.x) / self.w;
        let rel_y = (anchor.y - self.y) / self.h;
        Self {
            x: anchor.x - rel_x * w,
            y: anchor.y - rel_y * h,
            w,
            h,
        }
        .clamped()
    }

    /// Slide the region by a normalized offset.
    pub fn pan_by(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
        .clamped()
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

impl Default for ViewportRegion {
    fn default() -> Self {
        Self::full()
    }
}

/// Viewport widget state: the visible region plus the widget's pixel size.
///
/// All pointer positions coming from the host are screen pixels relative to
/// the widget; this type converts them to normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportState {
    region: ViewportRegion,
    size: Size,
}

impl ViewportState {
    pub fn new(size: Size) -> Self {
        Self {
            region: ViewportRegion::full(),
            size,
        }
    }

    pub fn region(&self) -> &ViewportRegion {
        &self.region
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Widget resized. The region is unaffected.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    pub fn set_region(&mut self, region: ViewportRegion) {
        self.region = region.clamped();
    }

    /// Screen pixels to normalized image coordinates (clamped).
    pub fn to_normalized(&self, screen: Point) -> Point {
        geometry::to_normalized(screen, self.size, &self.region)
    }

    /// Normalized image coordinates to screen pixels.
    pub fn to_screen(&self, norm: Point) -> Point {
        geometry::to_screen(norm, self.size, &self.region)
    }

    /// Zoom keeping the image point under `screen_anchor` fixed.
    pub fn zoom_at(&mut self, factor: f64, screen_anchor: Point) {
        let anchor = self.to_normalized(screen_anchor);
        self.region = self.region.zoom_about(factor, anchor);
        log::debug!("🔍 Zoom: {:.2}x", self.region.zoom());
    }

    /// Zoom about the center of the visible region.
    pub fn zoom_in(&mut self, factor: f64) {
        self.region = self.region.zoom_about(factor, self.region.center());
        log::debug!("🔍 Zoom in: {:.2}x", self.region.zoom());
    }

    pub fn zoom_out(&mut self, factor: f64) {
        self.region = self.region.zoom_about(1.0 / factor, self.region.center());
        log::debug!("🔍 Zoom out: {:.2}x", self.region.zoom());
    }

    /// Pan by a normalized offset of the region origin.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.region = self.region.pan_by(dx, dy);
    }

    /// Drag the image by a screen-pixel delta: dragging right reveals what
    /// is to the left.
    pub fn drag_by(&mut self, dx_px: f64, dy_px: f64) {
        if self.size.is_empty() {
            return;
        }
        let dx = -dx_px / self.size.width * self.region.w;
        let dy = -dy_px / self.size.height * self.region.h;
        self.region = self.region.pan_by(dx, dy);
        log::trace!("Pan drag: ({:.3}, {:.3})", self.region.x, self.region.y);
    }

    /// Back to the full image.
    pub fn reset(&mut self) {
        self.region = ViewportRegion::full();
        log::debug!("🔄 View reset");
    }
}
