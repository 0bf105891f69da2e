//! Rendering annotated frames out of the annotation directory.

use std::ops::Range;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgba, RgbaImage};
use thiserror::Error;
use vidanno_core::geometry::{derive_box, to_pixels};
use vidanno_core::{Annotation, AnnotationKind, Argb, Point, Size, StyleDefaults};

use crate::batch::{JobContext, JobError, JobSummary, clamp_range};
use crate::format::AnnotationDir;
use crate::frames::FrameSource;

/// Suffix appended to the source stem to name the rendered-frames directory.
pub const RENDER_DIR_SUFFIX: &str = "_render";

/// Errors raised by export sinks.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    #[error("Failed to write image {path:?}: {source}")]
    Image {
        /// Output file
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },
}

/// Receives annotated frames during an export.
pub trait ExportSink {
    /// Called once before the first frame.
    fn begin(&mut self, _total: usize) -> Result<(), ExportError> {
        Ok(())
    }

    /// One frame with its annotations, each paired with its resolved style.
    fn write_frame(
        &mut self,
        index: usize,
        frame: &DynamicImage,
        annotations: &[(Annotation, StyleDefaults)],
    ) -> Result<(), ExportError>;

    /// Called once after the last frame, also when cancelled.
    fn finish(&mut self) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Hand every frame of `range` with its saved annotations to `sink`.
/// Style fields set on an annotation override `defaults`.
pub fn export(
    source: &dyn FrameSource,
    dir: &AnnotationDir,
    range: Range<usize>,
    defaults: &StyleDefaults,
    sink: &mut dyn ExportSink,
    ctx: &JobContext,
) -> Result<JobSummary, JobError> {
    let range = clamp_range(range, source.len());
    let total = range.len();
    let mut summary = JobSummary::default();
    sink.begin(total)?;

    for index in range {
        if ctx.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        let frame = source.frame(index)?;
        let styled: Vec<(Annotation, StyleDefaults)> = dir
            .load(index)?
            .into_iter()
            .map(|a| {
                let style = defaults.resolve(&a.style);
                (a, style)
            })
            .collect();
        sink.write_frame(index, &frame, &styled)?;
        summary.processed += 1;
        summary.written += 1;
        ctx.report(summary.processed, total);
    }

    sink.finish()?;
    log::info!("🖼️ Exported {}/{} frames", summary.written, total);
    Ok(summary)
}

/// The render directory of a source: `foo/bar.mp4` → `foo/bar_render`.
pub fn render_dir_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{}{}", stem, RENDER_DIR_SUFFIX))
}

/// Writes each rendered frame as `<index:08>.png` into a folder.
#[derive(Debug, Clone)]
pub struct ImageFolderSink {
    root: PathBuf,
}

impl ImageFolderSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("{:08}.png", index))
    }
}

impl ExportSink for ImageFolderSink {
    fn begin(&mut self, _total: usize) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.root).map_err(|source| ExportError::Io {
            path: self.root.clone(),
            source,
        })
    }

    fn write_frame(
        &mut self,
        index: usize,
        frame: &DynamicImage,
        annotations: &[(Annotation, StyleDefaults)],
    ) -> Result<(), ExportError> {
        let path = self.frame_path(index);
        render_frame(frame, annotations)
            .save(&path)
            .map_err(|source| ExportError::Image { path, source })
    }
}

// ============================================================================
// Rasterizing
// ============================================================================

/// Draw annotation outlines and fills onto a copy of `frame`.
///
/// Label glyphs are not drawn; a Text annotation renders as its box filled
/// with the text fill color.
pub fn render_frame(frame: &DynamicImage, annotations: &[(Annotation, StyleDefaults)]) -> RgbaImage {
    let mut canvas = frame.to_rgba8();
    let size = Size::from_dimensions(canvas.width(), canvas.height());
    for (annotation, style) in annotations {
        let thickness = f64::from(style.thickness_px(canvas.height()));
        match annotation.kind {
            AnnotationKind::Rectangle | AnnotationKind::Text => {
                let bbox = derive_box(annotation, size);
                let fill = if annotation.kind == AnnotationKind::Text {
                    style.text_fill_color
                } else {
                    style.fill_color
                };
                let (x0, y0, x1, y1) = (bbox.x, bbox.y, bbox.x + bbox.width, bbox.y + bbox.height);
                paint(&mut canvas, style.color, fill, |px, py| {
                    let inside = px >= x0 && px <= x1 && py >= y0 && py <= y1;
                    let edge = (px - x0).min(x1 - px).min(py - y0).min(y1 - py);
                    classify(inside, inside && edge < thickness)
                });
            }
            AnnotationKind::Circle => {
                let center = to_pixels(Point::new(annotation.x, annotation.y), size);
                let rim = to_pixels(Point::new(annotation.x2, annotation.y2), size);
                let radius = center.distance_to(&rim);
                paint(&mut canvas, style.color, style.fill_color, |px, py| {
                    let d = Point::new(px, py).distance_to(&center);
                    classify(d <= radius, (radius - d).abs() < thickness / 2.0 + 0.5)
                });
            }
            AnnotationKind::Point => {
                let center = to_pixels(Point::new(annotation.x2, annotation.y2), size);
                let radius = thickness * 2.0;
                paint(&mut canvas, style.color, style.color, |px, py| {
                    classify(Point::new(px, py).distance_to(&center) <= radius, false)
                });
            }
        }
    }
    canvas
}

#[derive(Clone, Copy, PartialEq)]
enum Coverage {
    Outside,
    Inside,
    Edge,
}

fn classify(inside: bool, near_edge: bool) -> Coverage {
    match (inside, near_edge) {
        (_, true) => Coverage::Edge,
        (true, false) => Coverage::Inside,
        (false, false) => Coverage::Outside,
    }
}

/// Blend `stroke` on edge pixels and `fill` on inside pixels. `shape` gets
/// pixel-center coordinates.
fn paint(canvas: &mut RgbaImage, stroke: Argb, fill: Argb, shape: impl Fn(f64, f64) -> Coverage) {
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let color = match shape(f64::from(x) + 0.5, f64::from(y) + 0.5) {
            Coverage::Outside => continue,
            Coverage::Inside => fill,
            Coverage::Edge => stroke,
        };
        blend(pixel, color);
    }
}

fn blend(pixel: &mut Rgba<u8>, color: Argb) {
    if color.a == 0 {
        return;
    }
    let alpha = u16::from(color.a);
    let mix = |dst: u8, src: u8| -> u8 {
        ((u16::from(src) * alpha + u16::from(dst) * (255 - alpha) + 127) / 255) as u8
    };
    let [r, g, b, a] = pixel.0;
    pixel.0 = [
        mix(r, color.r),
        mix(g, color.g),
        mix(b, color.b),
        a.max(color.a),
    ];
}
