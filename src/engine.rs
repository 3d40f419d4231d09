use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

use crate::camera::{Camera, Point};
use crate::config::{ConfigError, EditorConfig};
use crate::consts::{MAX_FONT_SIZE, MIN_BOX_SIZE, MIN_DRAG_EXTENT, MIN_FONT_SIZE, MIN_RADIUS};
use crate::doc::{
    ConnectorShape, DocStore, EllipseShape, ImageShape, LineShape, ObjectId, ObjectKind, PathShape, RectShape,
    SceneObject, Shape, StyleEdit, TextShape,
};
use crate::geometry::{Bounds, Corner, shape_bounds, text_extent};
use crate::history::History;
use crate::hit::{self, HitPart, Tolerance};
use crate::image::{self, ImageError, ImageStatus, ImageTable};
use crate::input::{Button, InputState, Key, Modifiers, TextEdit, Tool, UiState, WheelDelta};
use crate::persist::{self, LoadError, LoadReport};
use crate::render;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Side effects returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The scene or view changed; schedule a redraw.
    RenderNeeded,
    /// A mutation was committed; persist this object list as the page's `canvasData`.
    SaveRequested(Vec<SceneObject>),
    /// Start decoding the image for `id` from its data URI.
    DecodeImage { id: ObjectId, source: String },
    /// Show the host's image file picker.
    OpenImagePicker,
    /// Show an inline text editor. `id` is `None` for new text.
    EditTextRequested { id: Option<ObjectId>, at: Point, text: String, font_size: f64 },
    SetCursor(String),
}

/// Core engine state — all logic that doesn't depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub doc: DocStore,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    pub history: History,
    pub images: ImageTable,
    config: EditorConfig,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::from_config(EditorConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with a host-supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a value is out of range.
    pub fn with_config(config: EditorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: EditorConfig) -> Self {
        Self {
            doc: DocStore::new(),
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            history: History::new(config.history_limit),
            images: ImageTable::new(),
            config,
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
        }
    }

    // --- Page data ---

    /// Replace the scene with a page's `canvasData`. History restarts from the loaded state.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::NotAnArray` for a non-array value; the current scene is kept.
    pub fn load_page(&mut self, data: Option<&Value>) -> Result<(Vec<Action>, LoadReport), LoadError> {
        let (objects, report) = persist::decode_canvas_data(data)?;
        info!(loaded = report.loaded, skipped = report.skipped, "canvas page loaded");

        self.doc.clear();
        self.doc.load_snapshot(objects);
        self.history.reset(self.doc.snapshot());
        self.ui.clear_selection();
        self.ui.text_edit = None;
        self.input = InputState::Idle;
        self.images.clear();

        let mut actions = self.decode_requests();
        actions.push(Action::RenderNeeded);
        Ok((actions, report))
    }

    /// The current scene as the JSON value stored in the page's `canvasData`.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn canvas_data(&self) -> Result<Value, serde_json::Error> {
        persist::to_canvas_data(self.doc.objects())
    }

    // --- Tool / viewport ---

    /// Switch tools. Any gesture or text edit in progress is abandoned.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        debug!(?tool, "tool selected");
        self.input = InputState::Idle;
        self.ui.text_edit = None;
        if tool != Tool::Select {
            self.ui.clear_selection();
        }
        self.ui.tool = tool;

        let mut actions = vec![Action::SetCursor(tool.cursor().to_owned()), Action::RenderNeeded];
        if tool == Tool::Image {
            actions.push(Action::OpenImagePicker);
        }
        actions
    }

    /// Update viewport dimensions (CSS pixels) and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        self.viewport_width = width_css;
        self.viewport_height = height_css;
        self.dpr = dpr;
        vec![Action::RenderNeeded]
    }

    pub fn zoom_in(&mut self) -> Vec<Action> {
        let factor = self.config.button_zoom_factor;
        self.zoom_by(self.viewport_center(), factor)
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        let factor = 1.0 / self.config.button_zoom_factor;
        self.zoom_by(self.viewport_center(), factor)
    }

    /// Return the camera to the identity transform.
    pub fn reset_view(&mut self) -> Vec<Action> {
        self.camera.reset();
        vec![Action::RenderNeeded]
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);

        if button == Button::Middle || (button == Button::Primary && self.ui.tool == Tool::Pan) {
            self.input = InputState::Panning { last_screen: screen_pt };
            return vec![Action::SetCursor("grabbing".into())];
        }
        if button != Button::Primary {
            return Vec::new();
        }

        match self.ui.tool {
            Tool::Select => self.select_down(world, modifiers),
            Tool::Draw => {
                self.input = InputState::Drawing { points: vec![world] };
                vec![Action::RenderNeeded]
            }
            tool if tool.is_sketch() => {
                self.input = InputState::Sketching { tool, start: world, current: world };
                vec![Action::RenderNeeded]
            }
            Tool::Text => {
                self.ui.text_edit = Some(TextEdit { id: None, at: world });
                vec![Action::EditTextRequested {
                    id: None,
                    at: world,
                    text: String::new(),
                    font_size: self.ui.style.font_size,
                }]
            }
            Tool::Connect => {
                let tol = self.tolerance();
                match hit::topmost(world, &self.doc, tol, |o| o.shape.kind() != ObjectKind::Connector) {
                    Some(from) => {
                        self.input = InputState::Connecting { from, current: world };
                        vec![Action::RenderNeeded]
                    }
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        if self.input.is_idle() {
            return self.hover_cursor(world);
        }

        match &mut self.input {
            InputState::Idle => Vec::new(),
            InputState::Panning { last_screen } => {
                self.camera.pan_by(screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                *last_screen = screen_pt;
                vec![Action::RenderNeeded]
            }
            InputState::Dragging { start_world, originals, moved } => {
                let dx = world.x - start_world.x;
                let dy = world.y - start_world.y;
                if (dx != 0.0 || dy != 0.0) && !originals.is_empty() {
                    *moved = true;
                }
                for original in originals.iter() {
                    if let Some(obj) = self.doc.get_mut(original.id) {
                        obj.shape = original.shape.clone();
                        obj.shape.translate(dx, dy);
                    }
                }
                vec![Action::RenderNeeded]
            }
            InputState::Resizing { id, corner, start_world, original, resized } => {
                let dx = world.x - start_world.x;
                let dy = world.y - start_world.y;
                if let Some(obj) = self.doc.get_mut(*id) {
                    obj.shape = resize_shape(&original.shape, *corner, dx, dy);
                    *resized = true;
                }
                vec![Action::RenderNeeded]
            }
            InputState::Drawing { points } => {
                points.push(world);
                vec![Action::RenderNeeded]
            }
            InputState::Sketching { current, .. } | InputState::Connecting { current, .. } => {
                *current = world;
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let mut actions = Vec::new();

        match std::mem::take(&mut self.input) {
            InputState::Idle => {}
            InputState::Panning { .. } => {
                actions.push(Action::SetCursor(self.ui.tool.cursor().to_owned()));
            }
            InputState::Dragging { originals, moved, .. } => {
                if moved {
                    debug!(count = originals.len(), "objects moved");
                    self.commit(&mut actions);
                }
            }
            InputState::Resizing { id, resized, .. } => {
                if resized {
                    debug!(id, "object resized");
                    self.commit(&mut actions);
                }
            }
            InputState::Drawing { points } => {
                if points.len() >= 2 {
                    let style = &self.ui.style;
                    let shape = Shape::Path(PathShape {
                        points,
                        stroke_color: style.stroke_color.clone(),
                        stroke_width: style.stroke_width,
                        opacity: style.opacity,
                    });
                    self.create(shape, &mut actions);
                } else {
                    actions.push(Action::RenderNeeded);
                }
            }
            InputState::Sketching { tool, start, .. } => match self.sketch_shape(tool, start, world) {
                Some(shape) => self.create(shape, &mut actions),
                None => actions.push(Action::RenderNeeded),
            },
            InputState::Connecting { from, .. } => {
                let tol = self.tolerance();
                let target = hit::topmost(world, &self.doc, tol, |o| o.shape.kind() != ObjectKind::Connector);
                match target {
                    Some(to) if self.doc.can_connect(from, to) => {
                        let style = &self.ui.style;
                        let shape = Shape::Connector(ConnectorShape {
                            from_id: from,
                            to_id: to,
                            stroke_color: style.stroke_color.clone(),
                            stroke_width: style.stroke_width,
                            opacity: style.opacity,
                        });
                        self.create(shape, &mut actions);
                    }
                    _ => actions.push(Action::RenderNeeded),
                }
            }
        }
        actions
    }

    /// Wheel zooms around the cursor: in for upward scroll, out otherwise.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        let factor = if delta.dy < 0.0 {
            self.config.wheel_zoom_factor
        } else {
            1.0 / self.config.wheel_zoom_factor
        };
        self.zoom_by(screen_pt, factor)
    }

    /// Keyboard shortcuts. Ignored while a text edit is open.
    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if self.ui.text_edit.is_some() {
            return Vec::new();
        }
        let name = key.0.to_ascii_lowercase();
        match name.as_str() {
            "delete" | "backspace" => self.delete_selected(),
            "escape" => {
                self.input = InputState::Idle;
                self.ui.clear_selection();
                vec![Action::RenderNeeded]
            }
            "z" if modifiers.command() && modifiers.shift => self.redo(),
            "z" if modifiers.command() => self.undo(),
            "y" if modifiers.command() => self.redo(),
            "a" if modifiers.command() => self.select_all(),
            _ => Vec::new(),
        }
    }

    /// Re-open the topmost text object under the pointer for editing.
    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let tol = self.tolerance();
        let Some(id) = hit::topmost(world, &self.doc, tol, |o| o.shape.kind() == ObjectKind::Text) else {
            return Vec::new();
        };
        let Some(Shape::Text(t)) = self.doc.get(id).map(|o| &o.shape) else {
            return Vec::new();
        };
        let at = Point::new(t.x, t.y);
        let action = Action::EditTextRequested { id: Some(id), at, text: t.text.clone(), font_size: t.font_size };
        self.input = InputState::Idle;
        self.ui.text_edit = Some(TextEdit { id: Some(id), at });
        vec![action]
    }

    // --- Text ---

    /// Finish the open text edit with `text`.
    ///
    /// Blank text discards a new edit and deletes an existing object.
    pub fn commit_text(&mut self, text: &str) -> Vec<Action> {
        let Some(edit) = self.ui.text_edit.take() else {
            return Vec::new();
        };
        let blank = text.trim().is_empty();
        let mut actions = Vec::new();

        if let Some(id) = edit.id {
            if self.doc.get(id).is_some() {
                if blank {
                    self.doc.remove(id);
                    self.ui.selected.retain(|s| *s != id);
                    debug!(id, "empty text removed");
                    self.commit(&mut actions);
                    return actions;
                }
                let changed = match self.doc.get_mut(id).map(|o| &mut o.shape) {
                    Some(Shape::Text(t)) if t.text != text => {
                        t.text = text.to_owned();
                        true
                    }
                    _ => false,
                };
                if changed {
                    self.commit(&mut actions);
                } else {
                    actions.push(Action::RenderNeeded);
                }
                return actions;
            }
            warn!(id, "edited text object no longer exists");
        }

        if blank {
            return vec![Action::RenderNeeded];
        }
        let style = &self.ui.style;
        let shape = Shape::Text(TextShape {
            x: edit.at.x,
            y: edit.at.y,
            text: text.to_owned(),
            font_size: style.font_size,
            stroke_color: style.stroke_color.clone(),
            opacity: style.opacity,
        });
        self.create(shape, &mut actions);
        actions
    }

    /// Close the open text edit without changes.
    pub fn cancel_text(&mut self) -> Vec<Action> {
        self.ui.text_edit = None;
        vec![Action::RenderNeeded]
    }

    // --- Images ---

    /// Validate an upload before the host reads it.
    ///
    /// # Errors
    ///
    /// `ImageError::NotAnImage` or `ImageError::TooLarge`; the message is user-facing.
    pub fn check_upload(&self, mime: &str, size: u64) -> Result<(), ImageError> {
        image::check_upload(mime, size, self.config.max_upload_bytes)
            .inspect_err(|e| warn!(mime, size, error = %e, "image upload rejected"))
    }

    /// Place an image of known natural size, centered in the visible viewport.
    pub fn place_image(&mut self, source: String, width: f64, height: f64) -> Vec<Action> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            warn!(width, height, "ignoring image with unusable dimensions");
            return Vec::new();
        }
        let (w, h) = image::fit_within(width, height, self.config.max_image_dimension);
        let center = self.camera.screen_to_world(self.viewport_center());
        let shape = Shape::Image(ImageShape {
            x: center.x - w / 2.0,
            y: center.y - h / 2.0,
            width: w,
            height: h,
            source,
            opacity: self.ui.style.opacity,
        });
        let mut actions = Vec::new();
        self.create(shape, &mut actions);
        actions
    }

    /// Place an image whose size is read from the encoded data.
    ///
    /// # Errors
    ///
    /// Fails if `source` is not a decodable base64 image data URI. No object is created.
    pub fn place_image_data_uri(&mut self, source: String) -> Result<Vec<Action>, ImageError> {
        let (w, h) = image::probe_data_uri(&source)?;
        Ok(self.place_image(source, f64::from(w), f64::from(h)))
    }

    /// The host finished decoding the image for `id`.
    pub fn image_decoded(&mut self, id: ObjectId, width: u32, height: u32) -> Vec<Action> {
        if self.images.mark_ready(id, width, height) {
            vec![Action::RenderNeeded]
        } else {
            Vec::new()
        }
    }

    // --- Editing ---

    pub fn undo(&mut self) -> Vec<Action> {
        match self.history.undo().map(<[SceneObject]>::to_vec) {
            Some(snapshot) => self.restore(snapshot),
            None => Vec::new(),
        }
    }

    pub fn redo(&mut self) -> Vec<Action> {
        match self.history.redo().map(<[SceneObject]>::to_vec) {
            Some(snapshot) => self.restore(snapshot),
            None => Vec::new(),
        }
    }

    /// Delete every selected object along with attached connectors.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let selected = std::mem::take(&mut self.ui.selected);
        let removed: usize = selected.iter().map(|id| self.doc.remove(*id).len()).sum();
        let mut actions = Vec::new();
        if removed > 0 {
            debug!(removed, "objects deleted");
            self.commit(&mut actions);
        }
        actions
    }

    /// Remove every object.
    pub fn clear(&mut self) -> Vec<Action> {
        if self.doc.is_empty() {
            return Vec::new();
        }
        self.doc.clear();
        self.ui.clear_selection();
        self.input = InputState::Idle;
        let mut actions = Vec::new();
        self.commit(&mut actions);
        actions
    }

    pub fn select_all(&mut self) -> Vec<Action> {
        self.ui.selected = self.doc.ids();
        vec![Action::RenderNeeded]
    }

    /// Apply a style edit to the selection and to the style used for new objects.
    pub fn apply_style(&mut self, edit: &StyleEdit) -> Vec<Action> {
        edit.apply_to_style(&mut self.ui.style);
        let mut changed = false;
        for id in &self.ui.selected {
            if let Some(obj) = self.doc.get_mut(*id) {
                changed |= obj.shape.apply_style(edit);
            }
        }
        let mut actions = Vec::new();
        if changed {
            self.commit(&mut actions);
        }
        actions
    }

    // --- Queries ---

    #[must_use]
    pub fn selection(&self) -> &[ObjectId] {
        &self.ui.selected
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.ui.tool
    }

    /// Look up an object by ID.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.doc.get(id)
    }

    #[must_use]
    pub fn objects(&self) -> &[SceneObject] {
        self.doc.objects()
    }

    #[must_use]
    pub fn image_status(&self, id: ObjectId) -> Option<ImageStatus> {
        self.images.status(id)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Internals ---

    fn tolerance(&self) -> Tolerance {
        Tolerance::for_camera(&self.camera, self.config.hit_margin_px, self.config.handle_size_px)
    }

    fn viewport_center(&self) -> Point {
        Point::new(self.viewport_width / 2.0, self.viewport_height / 2.0)
    }

    fn zoom_by(&mut self, anchor: Point, factor: f64) -> Vec<Action> {
        let target = self.camera.zoom * factor;
        self.camera.zoom_at(anchor, target, self.config.min_zoom, self.config.max_zoom);
        vec![Action::RenderNeeded]
    }

    fn select_down(&mut self, world: Point, modifiers: Modifiers) -> Vec<Action> {
        let tol = self.tolerance();
        let Some(hit) = hit::hit_test(world, &self.doc, &self.ui.selected, tol) else {
            if !modifiers.shift {
                self.ui.clear_selection();
            }
            return vec![Action::RenderNeeded];
        };

        match hit.part {
            HitPart::ResizeHandle(corner) => {
                let Some(original) = self.doc.get(hit.object_id).cloned() else {
                    return Vec::new();
                };
                self.input = InputState::Resizing {
                    id: hit.object_id,
                    corner,
                    start_world: world,
                    original,
                    resized: false,
                };
                vec![Action::SetCursor(corner.cursor().to_owned())]
            }
            HitPart::Body => {
                if modifiers.shift {
                    self.ui.toggle(hit.object_id);
                } else if !self.ui.is_selected(hit.object_id) {
                    self.ui.select_only(hit.object_id);
                }
                if self.ui.is_selected(hit.object_id) {
                    let originals = self
                        .ui
                        .selected
                        .iter()
                        .filter_map(|id| self.doc.get(*id))
                        .filter(|o| o.shape.kind() != ObjectKind::Connector)
                        .cloned()
                        .collect();
                    self.input = InputState::Dragging { start_world: world, originals, moved: false };
                }
                vec![Action::SetCursor("move".into()), Action::RenderNeeded]
            }
        }
    }

    fn hover_cursor(&self, world: Point) -> Vec<Action> {
        if self.ui.tool != Tool::Select {
            return Vec::new();
        }
        let tol = self.tolerance();
        let cursor = if let Some((_, corner)) = hit::hit_handle(world, &self.doc, &self.ui.selected, tol) {
            corner.cursor()
        } else if hit::topmost(world, &self.doc, tol, |_| true).is_some() {
            "move"
        } else {
            "default"
        };
        vec![Action::SetCursor(cursor.to_owned())]
    }

    /// Build the shape for a finished line/rect/ellipse drag, or `None` if the drag was too small.
    fn sketch_shape(&self, tool: Tool, start: Point, end: Point) -> Option<Shape> {
        let dx = (end.x - start.x).abs();
        let dy = (end.y - start.y).abs();
        let style = &self.ui.style;
        match tool {
            Tool::Line if dx > MIN_DRAG_EXTENT || dy > MIN_DRAG_EXTENT => Some(Shape::Line(LineShape {
                x: start.x,
                y: start.y,
                x2: end.x,
                y2: end.y,
                stroke_color: style.stroke_color.clone(),
                stroke_width: style.stroke_width,
                opacity: style.opacity,
            })),
            Tool::Rect if dx > MIN_DRAG_EXTENT && dy > MIN_DRAG_EXTENT => {
                let b = Bounds::from_points(start, end);
                Some(Shape::Rect(RectShape {
                    x: b.x,
                    y: b.y,
                    width: b.width,
                    height: b.height,
                    stroke_color: style.stroke_color.clone(),
                    fill_color: style.fill_color.clone(),
                    fill_enabled: style.fill_enabled,
                    stroke_width: style.stroke_width,
                    opacity: style.opacity,
                }))
            }
            Tool::Ellipse if dx > MIN_DRAG_EXTENT && dy > MIN_DRAG_EXTENT => {
                let center = Bounds::from_points(start, end).center();
                Some(Shape::Ellipse(EllipseShape {
                    x: center.x,
                    y: center.y,
                    radius_x: (dx / 2.0).max(MIN_RADIUS),
                    radius_y: (dy / 2.0).max(MIN_RADIUS),
                    stroke_color: style.stroke_color.clone(),
                    fill_color: style.fill_color.clone(),
                    fill_enabled: style.fill_enabled,
                    stroke_width: style.stroke_width,
                    opacity: style.opacity,
                }))
            }
            _ => None,
        }
    }

    /// Insert a new object and commit. New objects start unselected.
    fn create(&mut self, shape: Shape, actions: &mut Vec<Action>) {
        let kind = shape.kind();
        let id = self.doc.insert(shape);
        debug!(id, ?kind, "object created");
        self.ui.clear_selection();
        self.commit(actions);
    }

    /// Record the live scene in history and ask the host to persist it.
    fn commit(&mut self, actions: &mut Vec<Action>) {
        let snapshot = self.doc.snapshot();
        self.history.save(snapshot.clone());
        actions.extend(self.decode_requests());
        actions.push(Action::SaveRequested(snapshot));
        actions.push(Action::RenderNeeded);
    }

    /// Swap in a history snapshot.
    fn restore(&mut self, snapshot: Vec<SceneObject>) -> Vec<Action> {
        self.doc.load_snapshot(snapshot);
        self.ui.clear_selection();
        self.ui.text_edit = None;
        self.input = InputState::Idle;
        let mut actions = self.decode_requests();
        actions.push(Action::SaveRequested(self.doc.snapshot()));
        actions.push(Action::RenderNeeded);
        actions
    }

    fn decode_requests(&mut self) -> Vec<Action> {
        self.images
            .reconcile(&self.doc)
            .into_iter()
            .map(|(id, source)| Action::DecodeImage { id, source })
            .collect()
    }
}

/// Apply a corner drag of `(dx, dy)` world units to the shape as it was when the resize started.
fn resize_shape(original: &Shape, corner: Corner, dx: f64, dy: f64) -> Shape {
    let mut shape = original.clone();
    match &mut shape {
        Shape::Rect(r) => {
            (r.x, r.y, r.width, r.height) = resize_box(Bounds::new(r.x, r.y, r.width, r.height), corner, dx, dy);
        }
        Shape::Image(i) => {
            (i.x, i.y, i.width, i.height) = resize_box(Bounds::new(i.x, i.y, i.width, i.height), corner, dx, dy);
        }
        Shape::Ellipse(e) => {
            let sx = if corner.is_west() { -1.0 } else { 1.0 };
            let sy = if corner.is_north() { -1.0 } else { 1.0 };
            e.radius_x = (e.radius_x + sx * dx / 2.0).max(MIN_RADIUS);
            e.radius_y = (e.radius_y + sy * dy / 2.0).max(MIN_RADIUS);
        }
        Shape::Text(t) => {
            let Some(start) = shape_bounds(original) else {
                return shape;
            };
            let w = if corner.is_west() { start.width - dx } else { start.width + dx };
            let h = if corner.is_north() { start.height - dy } else { start.height + dy };
            let scale = ratio(w, start.width).max(ratio(h, start.height));
            t.font_size = (t.font_size * scale).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
            let (new_w, new_h) = text_extent(&t.text, t.font_size);
            t.x = if corner.is_west() { start.right() - new_w } else { start.x };
            t.y = if corner.is_north() { start.bottom() - new_h } else { start.y };
        }
        Shape::Path(_) | Shape::Line(_) | Shape::Connector(_) => {}
    }
    shape
}

/// Resize a box by a corner delta, clamping both sides and keeping the opposite corner fixed.
fn resize_box(b: Bounds, corner: Corner, dx: f64, dy: f64) -> (f64, f64, f64, f64) {
    let w = if corner.is_west() { b.width - dx } else { b.width + dx }.max(MIN_BOX_SIZE);
    let h = if corner.is_north() { b.height - dy } else { b.height + dy }.max(MIN_BOX_SIZE);
    let x = if corner.is_west() { b.right() - w } else { b.x };
    let y = if corner.is_north() { b.bottom() - h } else { b.y };
    (x, y, w, h)
}

fn ratio(new: f64, old: f64) -> f64 {
    if old > 0.0 { new / old } else { 1.0 }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas
/// element plus one decoded `HtmlImageElement` per image object.
pub struct Engine {
    canvas: HtmlCanvasElement,
    images: HashMap<ObjectId, HtmlImageElement>,
    pub core: EngineCore,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas, images: HashMap::new(), core: EngineCore::new() }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when a value is out of range.
    pub fn with_config(canvas: HtmlCanvasElement, config: EditorConfig) -> Result<Self, ConfigError> {
        Ok(Self { canvas, images: HashMap::new(), core: EngineCore::with_config(config)? })
    }

    // --- Delegated page data ---

    /// # Errors
    ///
    /// Returns the `LoadError` message for unusable `canvasData`, or the
    /// `JsValue` of a failed image element creation.
    pub fn load_page(&mut self, data: Option<&Value>) -> Result<Vec<Action>, JsValue> {
        let (actions, _report) = self.core.load_page(data).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.images.clear();
        self.track_images(actions)
    }

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.core.set_tool(tool)
    }

    /// Update viewport dimensions and device pixel ratio, resizing the backing store.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) -> Vec<Action> {
        self.canvas.set_width((width_css * dpr).round().max(0.0) as u32);
        self.canvas.set_height((height_css * dpr).round().max(0.0) as u32);
        self.core.set_viewport(width_css, height_css, dpr)
    }

    // --- Delegated input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers)
    }

    /// # Errors
    ///
    /// Returns the `JsValue` of a failed image element creation.
    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_pointer_up(screen_pt, button, modifiers);
        self.track_images(actions)
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    /// # Errors
    ///
    /// Returns the `JsValue` of a failed image element creation (undo/redo may restore images).
    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.on_key_down(key, modifiers);
        self.track_images(actions)
    }

    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        self.core.on_double_click(screen_pt)
    }

    /// # Errors
    ///
    /// Returns the `JsValue` of a failed image element creation.
    pub fn commit_text(&mut self, text: &str) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.commit_text(text);
        self.track_images(actions)
    }

    // --- Images ---

    /// # Errors
    ///
    /// Returns the `JsValue` of a failed image element creation.
    pub fn place_image(&mut self, source: String, width: f64, height: f64) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.place_image(source, width, height);
        self.track_images(actions)
    }

    /// # Errors
    ///
    /// Returns the `ImageError` message when the data URI cannot be probed, or
    /// the `JsValue` of a failed image element creation.
    pub fn place_image_data_uri(&mut self, source: String) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.place_image_data_uri(source).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.track_images(actions)
    }

    /// The decoded element for an image object, for the host to attach its `load` listener.
    #[must_use]
    pub fn image_element(&self, id: ObjectId) -> Option<&HtmlImageElement> {
        self.images.get(&id)
    }

    /// Called from the element's `load` event; reads the natural size from the element.
    pub fn image_decoded(&mut self, id: ObjectId) -> Vec<Action> {
        let Some(el) = self.images.get(&id) else {
            return Vec::new();
        };
        let (w, h) = (el.natural_width(), el.natural_height());
        self.core.image_decoded(id, w, h)
    }

    // --- Delegated editing ---

    /// # Errors
    ///
    /// Returns the `JsValue` of a failed image element creation.
    pub fn undo(&mut self) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.undo();
        self.track_images(actions)
    }

    /// # Errors
    ///
    /// Returns the `JsValue` of a failed image element creation.
    pub fn redo(&mut self) -> Result<Vec<Action>, JsValue> {
        let actions = self.core.redo();
        self.track_images(actions)
    }

    pub fn delete_selected(&mut self) -> Vec<Action> {
        let actions = self.core.delete_selected();
        self.prune_images();
        actions
    }

    pub fn clear(&mut self) -> Vec<Action> {
        let actions = self.core.clear();
        self.prune_images();
        actions
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or any `Canvas2D` call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        render::draw(&ctx, &self.core, &self.images)
    }

    /// Start loading an element for every `DecodeImage` action and drop elements
    /// whose objects left the scene.
    fn track_images(&mut self, actions: Vec<Action>) -> Result<Vec<Action>, JsValue> {
        for action in &actions {
            if let Action::DecodeImage { id, source } = action {
                let el = HtmlImageElement::new()?;
                el.set_src(source);
                self.images.insert(*id, el);
            }
        }
        self.prune_images();
        Ok(actions)
    }

    fn prune_images(&mut self) {
        let core = &self.core;
        self.images.retain(|id, _| core.images.status(*id).is_some());
    }
}
