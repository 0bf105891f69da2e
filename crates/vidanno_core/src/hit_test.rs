//! Nearest-annotation lookup under the pointer.

use crate::annotation::{Annotation, AnnotationKind};
use crate::geometry::{distance, Point};
use crate::viewport::ViewportState;

/// A point annotation is hit when the pointer is closer than this (screen pixels).
pub const POINT_HIT_RADIUS: f64 = 5.0;

/// Index of the annotation under `pointer` (screen pixels), if any.
///
/// Candidates per kind:
/// - Point: within [`POINT_HIT_RADIUS`] of the point
/// - Circle: strictly inside the radius
/// - Rectangle/Text: inside the box, edges included
///
/// Among candidates the smallest distance to the point, circle center or box
/// center wins; on an exact tie the earlier index wins.
pub fn find_nearest(
    pointer: Point,
    annotations: &[Annotation],
    viewport: &ViewportState,
) -> Option<usize> {
    let mut nearest: Option<(usize, f64)> = None;
    for (i, annotation) in annotations.iter().enumerate() {
        let Some(d) = hit_distance(pointer, annotation, viewport) else {
            continue;
        };
        if nearest.is_none_or(|(_, best)| d < best) {
            nearest = Some((i, d));
        }
    }
    nearest.map(|(i, _)| i)
}

/// Distance used for ranking, or `None` when the pointer misses.
fn hit_distance(pointer: Point, annotation: &Annotation, viewport: &ViewportState) -> Option<f64> {
    let first = viewport.to_screen(Point::new(annotation.x, annotation.y));
    let second = viewport.to_screen(Point::new(annotation.x2, annotation.y2));
    match annotation.kind {
        AnnotationKind::Point => {
            let d = distance(pointer, second);
            (d < POINT_HIT_RADIUS).then_some(d)
        }
        AnnotationKind::Circle => {
            let d = distance(pointer, first);
            (d < distance(first, second)).then_some(d)
        }
        AnnotationKind::Rectangle | AnnotationKind::Text => {
            let (left, right) = (first.x.min(second.x), first.x.max(second.x));
            let (top, bottom) = (first.y.min(second.y), first.y.max(second.y));
            let inside =
                pointer.x >= left && pointer.x <= right && pointer.y >= top && pointer.y <= bottom;
            let center = Point::new((left + right) / 2.0, (top + bottom) / 2.0);
            inside.then(|| distance(pointer, center))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::viewport::ViewportRegion;

    fn viewport() -> ViewportState {
        ViewportState::new(Size::new(100.0, 100.0))
    }

    #[test]
    fn test_overlapping_rectangles_prefer_nearer_center() {
        let annotations = vec![
            Annotation::rectangle(0.0, 0.0, 0.6, 0.6),
            Annotation::rectangle(0.2, 0.2, 0.5, 0.5),
        ];
        // Center of the first is (30, 30), of the second (35, 35).
        assert_eq!(find_nearest(Point::new(36.0, 36.0), &annotations, &viewport()), Some(1));
        assert_eq!(find_nearest(Point::new(25.0, 25.0), &annotations, &viewport()), Some(0));
    }

    #[test]
    fn test_tie_goes_to_earlier_index() {
        let rect = Annotation::rectangle(0.2, 0.2, 0.4, 0.4);
        let annotations = vec![rect.clone(), rect];
        assert_eq!(find_nearest(Point::new(30.0, 30.0), &annotations, &viewport()), Some(0));
    }

    #[test]
    fn test_point_radius() {
        let annotations = vec![Annotation::point(0.5, 0.5)];
        assert_eq!(find_nearest(Point::new(53.0, 53.0), &annotations, &viewport()), Some(0));
        assert_eq!(find_nearest(Point::new(54.0, 54.0), &annotations, &viewport()), None);
    }

    #[test]
    fn test_circle_inside_radius() {
        let annotations = vec![Annotation::circle(0.5, 0.5, 0.6, 0.5)];
        assert_eq!(find_nearest(Point::new(55.0, 52.0), &annotations, &viewport()), Some(0));
        assert_eq!(find_nearest(Point::new(60.0, 50.0), &annotations, &viewport()), None);
    }

    #[test]
    fn test_rectangle_edges_are_inside() {
        let annotations = vec![Annotation::text_box(0.25, 0.25, 0.5, 0.5, "label")];
        assert_eq!(find_nearest(Point::new(25.0, 50.0), &annotations, &viewport()), Some(0));
        assert_eq!(find_nearest(Point::new(51.0, 50.0), &annotations, &viewport()), None);
    }

    #[test]
    fn test_point_beats_enclosing_box_when_nearer() {
        let annotations = vec![
            Annotation::rectangle(0.0, 0.0, 1.0, 1.0),
            Annotation::point(0.2, 0.2),
        ];
        assert_eq!(find_nearest(Point::new(21.0, 21.0), &annotations, &viewport()), Some(1));
    }

    #[test]
    fn test_hit_respects_zoom() {
        let mut vp = viewport();
        vp.set_region(ViewportRegion::new(0.5, 0.5, 0.5, 0.5));
        let annotations = vec![Annotation::point(0.75, 0.75)];
        assert_eq!(find_nearest(Point::new(50.0, 50.0), &annotations, &vp), Some(0));
        assert_eq!(find_nearest(Point::new(75.0, 75.0), &annotations, &vp), None);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(find_nearest(Point::new(1.0, 1.0), &[], &viewport()), None);
    }
}
