//! Connector routing: choose where a connector attaches to the two objects it joins.
//!
//! The router compares the horizontal and vertical offsets between the two
//! box centers. The dominant axis decides whether the connector runs between
//! facing vertical edges (left/right) or facing horizontal edges (top/bottom);
//! each anchor sits at the midpoint of its edge.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use crate::camera::Point;
use crate::doc::{ConnectorShape, DocStore};
use crate::geometry::{Bounds, shape_bounds};

/// Resolved attachment points of a connector, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchors {
    pub from: Point,
    pub to: Point,
}

/// Pick facing-edge anchors between two boxes.
///
/// Ties (`|dx| == |dy|`) attach vertically.
#[must_use]
pub fn route(from: &Bounds, to: &Bounds) -> Anchors {
    let a = from.center();
    let b = to.center();
    let dx = b.x - a.x;
    let dy = b.y - a.y;

    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            Anchors { from: Point::new(from.right(), a.y), to: Point::new(to.x, b.y) }
        } else {
            Anchors { from: Point::new(from.x, a.y), to: Point::new(to.right(), b.y) }
        }
    } else if dy > 0.0 {
        Anchors { from: Point::new(a.x, from.bottom()), to: Point::new(b.x, to.y) }
    } else {
        Anchors { from: Point::new(a.x, from.y), to: Point::new(b.x, to.bottom()) }
    }
}

/// Resolve a connector's anchors against the current scene.
///
/// Returns `None` when either endpoint is missing or has no bounds.
#[must_use]
pub fn resolve(connector: &ConnectorShape, doc: &DocStore) -> Option<Anchors> {
    let from = shape_bounds(&doc.get(connector.from_id)?.shape)?;
    let to = shape_bounds(&doc.get(connector.to_id)?.shape)?;
    Some(route(&from, &to))
}

/// The two barb endpoints of an arrowhead whose tip sits at `anchors.to`.
#[must_use]
pub fn arrowhead(anchors: &Anchors, size: f64, half_angle: f64) -> (Point, Point) {
    let angle = (anchors.to.y - anchors.from.y).atan2(anchors.to.x - anchors.from.x);
    let tip = anchors.to;
    let left = Point::new(
        tip.x - size * (angle - half_angle).cos(),
        tip.y - size * (angle - half_angle).sin(),
    );
    let right = Point::new(
        tip.x - size * (angle + half_angle).cos(),
        tip.y - size * (angle + half_angle).sin(),
    );
    (left, right)
}
