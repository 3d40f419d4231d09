#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::ELLIPSE_HIT_THRESHOLD;
use crate::doc::{DocStore, ObjectId, SceneObject, Shape};
use crate::geometry::{Bounds, Corner, point_segment_distance, shape_bounds};
use crate::router;

/// Which part of an object was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(Corner),
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub object_id: ObjectId,
    pub part: HitPart,
}

/// Hit slop in world units, derived from screen-pixel sizes at the current zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Distance added around shapes and thin strokes.
    pub margin: f64,
    /// Half the side length of a corner handle.
    pub handle_half: f64,
}

impl Tolerance {
    /// Convert screen-pixel sizes to world units for `camera`.
    #[must_use]
    pub fn for_camera(camera: &Camera, margin_px: f64, handle_size_px: f64) -> Self {
        Self {
            margin: camera.screen_dist_to_world(margin_px),
            handle_half: camera.screen_dist_to_world(handle_size_px) / 2.0,
        }
    }
}

/// Test which object (if any) is under `world_pt`, checking handles of selected objects first.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore, selected: &[ObjectId], tol: Tolerance) -> Option<Hit> {
    if let Some((object_id, corner)) = hit_handle(world_pt, doc, selected, tol) {
        return Some(Hit { object_id, part: HitPart::ResizeHandle(corner) });
    }
    topmost(world_pt, doc, tol, |_| true).map(|object_id| Hit { object_id, part: HitPart::Body })
}

/// Topmost object under `world_pt` that satisfies `accept`.
pub fn topmost<F>(world_pt: Point, doc: &DocStore, tol: Tolerance, accept: F) -> Option<ObjectId>
where
    F: Fn(&SceneObject) -> bool,
{
    doc.objects()
        .iter()
        .rev()
        .find(|obj| accept(obj) && point_in_object(world_pt, obj, doc, tol.margin))
        .map(|obj| obj.id)
}

/// Corner handle of a selected resizable object under `world_pt`.
#[must_use]
pub fn hit_handle(world_pt: Point, doc: &DocStore, selected: &[ObjectId], tol: Tolerance) -> Option<(ObjectId, Corner)> {
    for &id in selected.iter().rev() {
        let Some(obj) = doc.get(id) else {
            continue;
        };
        if !obj.shape.kind().is_resizable() {
            continue;
        }
        let Some(bounds) = shape_bounds(&obj.shape) else {
            continue;
        };
        for corner in Corner::ALL {
            let c = bounds.corner(corner);
            if (world_pt.x - c.x).abs() <= tol.handle_half && (world_pt.y - c.y).abs() <= tol.handle_half {
                return Some((id, corner));
            }
        }
    }
    None
}

/// Whether `p` hits `obj`, with `margin` world units of slop.
#[must_use]
pub fn point_in_object(p: Point, obj: &SceneObject, doc: &DocStore, margin: f64) -> bool {
    match &obj.shape {
        Shape::Rect(r) => Bounds::new(r.x, r.y, r.width, r.height).contains(p, margin),
        Shape::Image(i) => Bounds::new(i.x, i.y, i.width, i.height).contains(p, margin),
        Shape::Text(_) => shape_bounds(&obj.shape).is_some_and(|b| b.contains(p, margin)),
        Shape::Ellipse(e) => {
            if e.radius_x <= 0.0 || e.radius_y <= 0.0 {
                return false;
            }
            let nx = (p.x - e.x) / e.radius_x;
            let ny = (p.y - e.y) / e.radius_y;
            nx * nx + ny * ny <= ELLIPSE_HIT_THRESHOLD
        }
        Shape::Line(l) => point_segment_distance(p, Point::new(l.x, l.y), Point::new(l.x2, l.y2)) < margin,
        Shape::Path(path) => match path.points.as_slice() {
            [] => false,
            [only] => p.distance(*only) < margin,
            points => points
                .windows(2)
                .any(|seg| point_segment_distance(p, seg[0], seg[1]) < margin),
        },
        Shape::Connector(c) => {
            router::resolve(c, doc).is_some_and(|a| point_segment_distance(p, a.from, a.to) < margin)
        }
    }
}
