//! Document model: scene objects, their per-type attributes, and the in-memory store.
//!
//! This module defines what is on the canvas (`SceneObject`, `Shape`), the
//! style defaults applied to new objects (`Style`), a sparse style update for
//! the current selection (`StyleEdit`), and the runtime store that owns all
//! live objects in z-order (`DocStore`).
//!
//! Objects serialize to the page's `canvasData` format: an internal `type`
//! tag plus camelCase attribute names. Runtime-only decorations such as
//! decoded images never live here; see [`crate::image::ImageTable`].

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// Unique identifier for a scene object. Assigned in increasing order and never reused.
pub type ObjectId = u64;

/// The kind of a scene object, without its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Path,
    Line,
    Rect,
    Ellipse,
    Text,
    Image,
    Connector,
}

impl ObjectKind {
    /// Whether selected objects of this kind show corner resize handles.
    #[must_use]
    pub fn is_resizable(self) -> bool {
        matches!(self, Self::Rect | Self::Image | Self::Ellipse | Self::Text)
    }
}

/// A scene object as stored in the document and in `canvasData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    #[serde(flatten)]
    pub shape: Shape,
}

/// Per-type attributes of a scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Freehand stroke through an ordered list of points.
    Path(PathShape),
    /// Straight segment from `(x, y)` to `(x2, y2)`.
    Line(LineShape),
    /// Axis-aligned rectangle with top-left at `(x, y)`.
    Rect(RectShape),
    /// Axis-aligned ellipse centered at `(x, y)`.
    Ellipse(EllipseShape),
    /// Multi-line text with its top-left at `(x, y)`.
    Text(TextShape),
    /// Embedded raster image with its source kept as a data URI.
    Image(ImageShape),
    /// Arrow between two other objects, routed from their bounds.
    Connector(ConnectorShape),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathShape {
    pub points: Vec<Point>,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineShape {
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectShape {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_fill_color")]
    pub fill_color: String,
    #[serde(default)]
    pub fill_enabled: bool,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EllipseShape {
    pub x: f64,
    pub y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_fill_color")]
    pub fill_color: String,
    #[serde(default)]
    pub fill_enabled: bool,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextShape {
    pub x: f64,
    pub y: f64,
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageShape {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Image bytes as a `data:` URI.
    pub source: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorShape {
    pub from_id: ObjectId,
    pub to_id: ObjectId,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: String,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_stroke_color() -> String {
    "#000000".to_owned()
}

fn default_fill_color() -> String {
    "#ffffff".to_owned()
}

fn default_stroke_width() -> f64 {
    2.0
}

fn default_opacity() -> f64 {
    1.0
}

fn default_font_size() -> f64 {
    20.0
}

/// Style applied to newly created objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub stroke_color: String,
    pub fill_color: String,
    pub fill_enabled: bool,
    pub stroke_width: f64,
    pub opacity: f64,
    pub font_size: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke_color: default_stroke_color(),
            fill_color: default_fill_color(),
            fill_enabled: false,
            stroke_width: default_stroke_width(),
            opacity: default_opacity(),
            font_size: default_font_size(),
        }
    }
}

/// Sparse style update. Only present fields are applied, and only to shapes
/// that carry the attribute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

impl StyleEdit {
    /// Fold this edit into a full style.
    pub fn apply_to_style(&self, style: &mut Style) {
        if let Some(c) = &self.stroke_color {
            style.stroke_color.clone_from(c);
        }
        if let Some(c) = &self.fill_color {
            style.fill_color.clone_from(c);
        }
        if let Some(f) = self.fill_enabled {
            style.fill_enabled = f;
        }
        if let Some(w) = self.stroke_width {
            style.stroke_width = w;
        }
        if let Some(o) = self.opacity {
            style.opacity = o;
        }
        if let Some(s) = self.font_size {
            style.font_size = s;
        }
    }
}

fn set_if_changed<T: PartialEq + Clone>(slot: &mut T, value: Option<&T>) -> bool {
    match value {
        Some(v) if slot != v => {
            *slot = v.clone();
            true
        }
        _ => false,
    }
}

impl Shape {
    /// The discriminant of this shape.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Path(_) => ObjectKind::Path,
            Self::Line(_) => ObjectKind::Line,
            Self::Rect(_) => ObjectKind::Rect,
            Self::Ellipse(_) => ObjectKind::Ellipse,
            Self::Text(_) => ObjectKind::Text,
            Self::Image(_) => ObjectKind::Image,
            Self::Connector(_) => ObjectKind::Connector,
        }
    }

    /// Move the shape by a world-space delta. Connectors follow their endpoints and do not move.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Path(p) => {
                for pt in &mut p.points {
                    pt.x += dx;
                    pt.y += dy;
                }
            }
            Self::Line(l) => {
                l.x += dx;
                l.y += dy;
                l.x2 += dx;
                l.y2 += dy;
            }
            Self::Rect(r) => {
                r.x += dx;
                r.y += dy;
            }
            Self::Ellipse(e) => {
                e.x += dx;
                e.y += dy;
            }
            Self::Text(t) => {
                t.x += dx;
                t.y += dy;
            }
            Self::Image(i) => {
                i.x += dx;
                i.y += dy;
            }
            Self::Connector(_) => {}
        }
    }

    /// Whether this is a connector attached to `id`.
    #[must_use]
    pub fn references(&self, id: ObjectId) -> bool {
        matches!(self, Self::Connector(c) if c.from_id == id || c.to_id == id)
    }

    /// Apply a sparse style edit. Returns true if any attribute changed.
    pub fn apply_style(&mut self, edit: &StyleEdit) -> bool {
        let stroke = edit.stroke_color.as_ref();
        let fill = edit.fill_color.as_ref();
        let fill_on = edit.fill_enabled.as_ref();
        let width = edit.stroke_width.as_ref();
        let opacity = edit.opacity.as_ref();
        match self {
            Self::Path(p) => {
                set_if_changed(&mut p.stroke_color, stroke)
                    | set_if_changed(&mut p.stroke_width, width)
                    | set_if_changed(&mut p.opacity, opacity)
            }
            Self::Line(l) => {
                set_if_changed(&mut l.stroke_color, stroke)
                    | set_if_changed(&mut l.stroke_width, width)
                    | set_if_changed(&mut l.opacity, opacity)
            }
            Self::Rect(r) => {
                set_if_changed(&mut r.stroke_color, stroke)
                    | set_if_changed(&mut r.fill_color, fill)
                    | set_if_changed(&mut r.fill_enabled, fill_on)
                    | set_if_changed(&mut r.stroke_width, width)
                    | set_if_changed(&mut r.opacity, opacity)
            }
            Self::Ellipse(e) => {
                set_if_changed(&mut e.stroke_color, stroke)
                    | set_if_changed(&mut e.fill_color, fill)
                    | set_if_changed(&mut e.fill_enabled, fill_on)
                    | set_if_changed(&mut e.stroke_width, width)
                    | set_if_changed(&mut e.opacity, opacity)
            }
            Self::Text(t) => {
                set_if_changed(&mut t.stroke_color, stroke)
                    | set_if_changed(&mut t.font_size, edit.font_size.as_ref())
                    | set_if_changed(&mut t.opacity, opacity)
            }
            Self::Image(i) => set_if_changed(&mut i.opacity, opacity),
            Self::Connector(c) => {
                set_if_changed(&mut c.stroke_color, stroke)
                    | set_if_changed(&mut c.stroke_width, width)
                    | set_if_changed(&mut c.opacity, opacity)
            }
        }
    }
}

/// In-memory store of scene objects in z-order (first = bottom).
#[derive(Debug, Clone)]
pub struct DocStore {
    objects: Vec<SceneObject>,
    next_id: ObjectId,
}

impl DocStore {
    /// Create an empty store. The first assigned id is 1.
    #[must_use]
    pub fn new() -> Self {
        Self { objects: Vec::new(), next_id: 1 }
    }

    /// Append a new object on top, assigning it a fresh id.
    pub fn insert(&mut self, shape: Shape) -> ObjectId {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.objects.push(SceneObject { id, shape });
        id
    }

    /// Remove an object and every connector attached to it.
    ///
    /// Returns the removed objects, the requested one first. Empty when `id` is unknown.
    pub fn remove(&mut self, id: ObjectId) -> Vec<SceneObject> {
        let Some(pos) = self.objects.iter().position(|o| o.id == id) else {
            return Vec::new();
        };
        let mut removed = vec![self.objects.remove(pos)];
        let (attached, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.objects)
            .into_iter()
            .partition(|o| o.shape.references(id));
        self.objects = kept;
        removed.extend(attached);
        removed
    }

    /// Return a reference to an object by id.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Return a mutable reference to an object by id.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Whether a connector between `from` and `to` would be valid: both exist,
    /// differ, and neither is itself a connector.
    #[must_use]
    pub fn can_connect(&self, from: ObjectId, to: ObjectId) -> bool {
        if from == to {
            return false;
        }
        let endpoint_ok = |id| {
            self.get(id)
                .is_some_and(|o| o.shape.kind() != ObjectKind::Connector)
        };
        endpoint_ok(from) && endpoint_ok(to)
    }

    /// Replace all objects with a snapshot, keeping the id counter monotonic.
    pub fn load_snapshot(&mut self, objects: Vec<SceneObject>) {
        if let Some(max) = objects.iter().map(|o| o.id).max() {
            self.next_id = self.next_id.max(max.saturating_add(1));
        }
        self.objects = objects;
    }

    /// Clone of the full object list, suitable for history and persistence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SceneObject> {
        self.objects.clone()
    }

    /// Objects in draw order (bottom first).
    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Ids of all objects in draw order.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.iter().map(|o| o.id).collect()
    }

    /// The id the next inserted object will receive.
    #[must_use]
    pub fn next_id(&self) -> ObjectId {
        self.next_id
    }

    /// Remove every object. The id counter is not rewound.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Number of objects currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the store contains no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Default for DocStore {
    fn default() -> Self {
        Self::new()
    }
}
