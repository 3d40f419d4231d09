//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `UiState` is the editor state the renderer needs besides the scene
//! (tool, selection, default style, open text edit). `InputState` is the
//! gesture being tracked between pointer-down and pointer-up, carrying the
//! context needed to compute deltas and commit on release. Transitions live
//! in [`crate::engine`].

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::camera::Point;
use crate::doc::{ObjectId, SceneObject, Style};
use crate::geometry::Corner;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Drag to pan the viewport.
    Pan,
    /// Freehand stroke.
    Draw,
    /// Straight line segment.
    Line,
    /// Axis-aligned rectangle.
    Rect,
    /// Ellipse inscribed in the dragged box.
    Ellipse,
    /// Click to place text.
    Text,
    /// Place an uploaded image.
    Image,
    /// Connect two objects with an arrow.
    Connect,
}

impl Tool {
    /// Whether this tool draws a box-like shape by dragging (line, rect, ellipse).
    #[must_use]
    pub fn is_sketch(self) -> bool {
        matches!(self, Self::Line | Self::Rect | Self::Ellipse)
    }

    /// CSS cursor shown while this tool is idle over the canvas.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Select | Self::Image => "default",
            Self::Pan => "grab",
            Self::Text => "text",
            Self::Draw | Self::Line | Self::Rect | Self::Ellipse | Self::Connect => "crosshair",
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Delete"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// An inline text edit the host is showing.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    /// Object being re-edited, or `None` for new text.
    pub id: Option<ObjectId>,
    /// World-space top-left of the text.
    pub at: Point,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub tool: Tool,
    /// Selected object ids in selection order.
    pub selected: Vec<ObjectId>,
    /// Style applied to newly created objects.
    pub style: Style,
    pub text_edit: Option<TextEdit>,
}

impl UiState {
    #[must_use]
    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selected.contains(&id)
    }

    /// Add `id` if absent, remove it if present.
    pub fn toggle(&mut self, id: ObjectId) {
        if let Some(pos) = self.selected.iter().position(|s| *s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id);
        }
    }

    pub fn select_only(&mut self, id: ObjectId) {
        self.selected.clear();
        self.selected.push(id);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }
}

/// Internal state for the input state machine.
///
/// Each active variant carries gesture context needed to compute deltas and
/// commit on pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Dragging the viewport (pan tool or middle button).
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving the selected objects.
    Dragging {
        /// World-space pointer position at pointer-down.
        start_world: Point,
        /// Selected objects as they were at pointer-down. Connectors are left
        /// out since they follow their endpoints.
        originals: Vec<SceneObject>,
        /// Whether the pointer has moved since pointer-down.
        moved: bool,
    },
    /// Dragging a corner handle of a resizable object.
    Resizing {
        id: ObjectId,
        corner: Corner,
        start_world: Point,
        /// The object as it was at pointer-down.
        original: SceneObject,
        resized: bool,
    },
    /// Collecting points of a freehand stroke.
    Drawing { points: Vec<Point> },
    /// Previewing a line, rect or ellipse between two world points.
    Sketching { tool: Tool, start: Point, current: Point },
    /// Pending connection from `from`, with the pointer at `current`.
    Connecting { from: ObjectId, current: Point },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
