//! Axis-aligned bounds and distance helpers.
//!
//! Shared by hit-testing, connector routing, resize handles and rendering.
//! Everything here works in world coordinates.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use crate::camera::Point;
use crate::consts::{TEXT_CHAR_WIDTH_RATIO, TEXT_LINE_HEIGHT_RATIO};
use crate::doc::Shape;

/// An axis-aligned box. `width` and `height` are never negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One of the four box corners, used for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se];

    /// Whether dragging this corner moves the left edge.
    #[must_use]
    pub fn is_west(self) -> bool {
        matches!(self, Self::Nw | Self::Sw)
    }

    /// Whether dragging this corner moves the top edge.
    #[must_use]
    pub fn is_north(self) -> bool {
        matches!(self, Self::Nw | Self::Ne)
    }

    /// CSS resize cursor for this corner.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Nw | Self::Se => "nwse-resize",
            Self::Ne | Self::Sw => "nesw-resize",
        }
    }
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box containing both points.
    #[must_use]
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether `p` lies inside the box grown by `margin` on every side.
    #[must_use]
    pub fn contains(&self, p: Point, margin: f64) -> bool {
        p.x >= self.x - margin && p.x <= self.right() + margin && p.y >= self.y - margin && p.y <= self.bottom() + margin
    }

    /// Position of a corner.
    #[must_use]
    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::Nw => Point::new(self.x, self.y),
            Corner::Ne => Point::new(self.right(), self.y),
            Corner::Sw => Point::new(self.x, self.bottom()),
            Corner::Se => Point::new(self.right(), self.bottom()),
        }
    }
}

/// Shortest distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Approximate size of a text block: longest line times 0.6em wide, 1.2em per line tall.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn text_extent(text: &str, font_size: f64) -> (f64, f64) {
    let lines: Vec<&str> = text.split('\n').collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = longest as f64 * font_size * TEXT_CHAR_WIDTH_RATIO;
    let height = lines.len() as f64 * font_size * TEXT_LINE_HEIGHT_RATIO;
    (width, height)
}

/// Axis-aligned bounds of a shape.
///
/// Returns `None` for connectors, whose geometry depends on their endpoints
/// (see [`crate::router`]), and for paths without points.
#[must_use]
pub fn shape_bounds(shape: &Shape) -> Option<Bounds> {
    match shape {
        Shape::Path(p) => {
            let first = p.points.first()?;
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
            for pt in &p.points[1..] {
                min_x = min_x.min(pt.x);
                min_y = min_y.min(pt.y);
                max_x = max_x.max(pt.x);
                max_y = max_y.max(pt.y);
            }
            Some(Bounds::new(min_x, min_y, max_x - min_x, max_y - min_y))
        }
        Shape::Line(l) => Some(Bounds::from_points(Point::new(l.x, l.y), Point::new(l.x2, l.y2))),
        Shape::Rect(r) => Some(Bounds::new(r.x, r.y, r.width, r.height)),
        Shape::Image(i) => Some(Bounds::new(i.x, i.y, i.width, i.height)),
        Shape::Ellipse(e) => Some(Bounds::new(e.x - e.radius_x, e.y - e.radius_y, e.radius_x * 2.0, e.radius_y * 2.0)),
        Shape::Text(t) => {
            let (w, h) = text_extent(&t.text, t.font_size);
            Some(Bounds::new(t.x, t.y, w, h))
        }
        Shape::Connector(_) => None,
    }
}
