//! Rendering: draws the full canvas scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It receives a read-only view of the engine state plus the decoded image
//! elements and produces pixels; it does not mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::collections::HashMap;
use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use crate::camera::Point;
use crate::consts::{ARROW_ANGLE, ARROW_SIZE, TEXT_LINE_HEIGHT_RATIO};
use crate::doc::{
    ConnectorShape, DocStore, EllipseShape, ImageShape, LineShape, ObjectId, PathShape, RectShape, SceneObject,
    Shape, Style, TextShape,
};
use crate::engine::EngineCore;
use crate::geometry::{Bounds, Corner, shape_bounds};
use crate::image::ImageStatus;
use crate::input::{InputState, Tool};
use crate::router::{self, Anchors};

/// Selection and preview dash segment length in screen pixels.
const DASH_PX: f64 = 4.0;

const SELECTION_COLOR: &str = "#1E90FF";
const PLACEHOLDER_FILL: &str = "#f0f0f0";
const PLACEHOLDER_STROKE: &str = "#cccccc";

/// Draw the full scene: objects, selection UI and any gesture preview.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    core: &EngineCore,
    images: &HashMap<ObjectId, HtmlImageElement>,
) -> Result<(), JsValue> {
    let camera = &core.camera;
    let zoom = camera.zoom;

    // Layer 1: clear and set up transforms.
    ctx.set_transform(core.dpr, 0.0, 0.0, core.dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, core.viewport_width, core.viewport_height);
    ctx.translate(camera.pan_x, camera.pan_y)?;
    ctx.scale(zoom, zoom)?;

    // Layer 2: objects in array order (bottom first).
    for obj in core.doc.objects() {
        let image = images.get(&obj.id).filter(|_| {
            matches!(core.images.status(obj.id), Some(ImageStatus::Ready { .. }))
        });
        draw_object(ctx, obj, &core.doc, image)?;
    }

    // Layer 3: selection UI.
    let handle_world = core.config().handle_size_px / zoom;
    for id in &core.ui.selected {
        if let Some(obj) = core.doc.get(*id) {
            draw_selection(ctx, obj, &core.doc, zoom, handle_world)?;
        }
    }

    // Layer 4: in-progress gesture.
    draw_preview(ctx, &core.input, &core.doc, &core.ui.style, zoom)
}

// =============================================================
// Object dispatch
// =============================================================

fn draw_object(
    ctx: &CanvasRenderingContext2d,
    obj: &SceneObject,
    doc: &DocStore,
    image: Option<&HtmlImageElement>,
) -> Result<(), JsValue> {
    match &obj.shape {
        Shape::Path(p) => {
            draw_path(ctx, p);
            Ok(())
        }
        Shape::Line(l) => {
            draw_line(ctx, l);
            Ok(())
        }
        Shape::Rect(r) => {
            draw_rect(ctx, r);
            Ok(())
        }
        Shape::Ellipse(e) => draw_ellipse(ctx, e),
        Shape::Text(t) => draw_text(ctx, t),
        Shape::Image(i) => draw_image(ctx, i, image),
        Shape::Connector(c) => {
            draw_connector(ctx, c, doc);
            Ok(())
        }
    }
}

// =============================================================
// Shape renderers
// =============================================================

fn draw_path(ctx: &CanvasRenderingContext2d, path: &PathShape) {
    let Some((first, rest)) = path.points.split_first() else {
        return;
    };
    ctx.save();
    ctx.set_global_alpha(path.opacity);
    apply_stroke_style(ctx, &path.stroke_color, path.stroke_width);
    ctx.begin_path();
    ctx.move_to(first.x, first.y);
    for pt in rest {
        ctx.line_to(pt.x, pt.y);
    }
    ctx.stroke();
    ctx.restore();
}

fn draw_line(ctx: &CanvasRenderingContext2d, line: &LineShape) {
    ctx.save();
    ctx.set_global_alpha(line.opacity);
    apply_stroke_style(ctx, &line.stroke_color, line.stroke_width);
    ctx.begin_path();
    ctx.move_to(line.x, line.y);
    ctx.line_to(line.x2, line.y2);
    ctx.stroke();
    ctx.restore();
}

fn draw_rect(ctx: &CanvasRenderingContext2d, rect: &RectShape) {
    ctx.save();
    ctx.set_global_alpha(rect.opacity);
    if rect.fill_enabled {
        ctx.set_fill_style_str(&rect.fill_color);
        ctx.fill_rect(rect.x, rect.y, rect.width, rect.height);
    }
    apply_stroke_style(ctx, &rect.stroke_color, rect.stroke_width);
    ctx.stroke_rect(rect.x, rect.y, rect.width, rect.height);
    ctx.restore();
}

fn draw_ellipse(ctx: &CanvasRenderingContext2d, ellipse: &EllipseShape) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_global_alpha(ellipse.opacity);
    ctx.begin_path();
    ctx.ellipse(ellipse.x, ellipse.y, ellipse.radius_x, ellipse.radius_y, 0.0, 0.0, 2.0 * PI)?;
    if ellipse.fill_enabled {
        ctx.set_fill_style_str(&ellipse.fill_color);
        ctx.fill();
    }
    apply_stroke_style(ctx, &ellipse.stroke_color, ellipse.stroke_width);
    ctx.stroke();
    ctx.restore();
    Ok(())
}

fn draw_text(ctx: &CanvasRenderingContext2d, text: &TextShape) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_global_alpha(text.opacity);
    ctx.set_fill_style_str(&text.stroke_color);
    ctx.set_font(&format!("{:.0}px sans-serif", text.font_size));
    ctx.set_text_align("left");
    ctx.set_text_baseline("top");
    let line_height = text.font_size * TEXT_LINE_HEIGHT_RATIO;
    let mut y = text.y;
    for line in text.text.split('\n') {
        ctx.fill_text(line, text.x, y)?;
        y += line_height;
    }
    ctx.restore();
    Ok(())
}

/// Draw a decoded image, or a placeholder box while it is still loading.
fn draw_image(
    ctx: &CanvasRenderingContext2d,
    img: &ImageShape,
    element: Option<&HtmlImageElement>,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_global_alpha(img.opacity);
    match element.filter(|el| el.complete()) {
        Some(el) => {
            ctx.draw_image_with_html_image_element_and_dw_and_dh(el, img.x, img.y, img.width, img.height)?;
        }
        None => {
            ctx.set_fill_style_str(PLACEHOLDER_FILL);
            ctx.fill_rect(img.x, img.y, img.width, img.height);
            ctx.set_stroke_style_str(PLACEHOLDER_STROKE);
            ctx.set_line_width(1.0);
            ctx.stroke_rect(img.x, img.y, img.width, img.height);
        }
    }
    ctx.restore();
    Ok(())
}

/// Connectors with a missing endpoint are skipped.
fn draw_connector(ctx: &CanvasRenderingContext2d, connector: &ConnectorShape, doc: &DocStore) {
    let Some(anchors) = router::resolve(connector, doc) else {
        return;
    };
    ctx.save();
    ctx.set_global_alpha(connector.opacity);
    apply_stroke_style(ctx, &connector.stroke_color, connector.stroke_width);
    ctx.begin_path();
    ctx.move_to(anchors.from.x, anchors.from.y);
    ctx.line_to(anchors.to.x, anchors.to.y);
    ctx.stroke();
    draw_arrowhead(ctx, &anchors, &connector.stroke_color);
    ctx.restore();
}

fn draw_arrowhead(ctx: &CanvasRenderingContext2d, anchors: &Anchors, color: &str) {
    let (left, right) = router::arrowhead(anchors, ARROW_SIZE, ARROW_ANGLE);
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    ctx.move_to(anchors.to.x, anchors.to.y);
    ctx.line_to(left.x, left.y);
    ctx.line_to(right.x, right.y);
    ctx.close_path();
    ctx.fill();
}

// =============================================================
// Selection
// =============================================================

fn draw_selection(
    ctx: &CanvasRenderingContext2d,
    obj: &SceneObject,
    doc: &DocStore,
    zoom: f64,
    handle_world: f64,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(1.0 / zoom);
    set_dash(ctx, DASH_PX / zoom)?;

    if let Shape::Connector(c) = &obj.shape {
        if let Some(anchors) = router::resolve(c, doc) {
            ctx.begin_path();
            ctx.move_to(anchors.from.x, anchors.from.y);
            ctx.line_to(anchors.to.x, anchors.to.y);
            ctx.stroke();
        }
        clear_dash(ctx)?;
        ctx.restore();
        return Ok(());
    }

    let Some(bounds) = shape_bounds(&obj.shape) else {
        clear_dash(ctx)?;
        ctx.restore();
        return Ok(());
    };
    let pad = 2.0 / zoom;
    ctx.stroke_rect(bounds.x - pad, bounds.y - pad, bounds.width + pad * 2.0, bounds.height + pad * 2.0);
    clear_dash(ctx)?;

    if obj.shape.kind().is_resizable() {
        draw_handles(ctx, &bounds, handle_world);
    }
    ctx.restore();
    Ok(())
}

fn draw_handles(ctx: &CanvasRenderingContext2d, bounds: &Bounds, size: f64) {
    ctx.set_fill_style_str("#fff");
    ctx.set_stroke_style_str(SELECTION_COLOR);
    let half = size / 2.0;
    for corner in Corner::ALL {
        let c = bounds.corner(corner);
        ctx.fill_rect(c.x - half, c.y - half, size, size);
        ctx.stroke_rect(c.x - half, c.y - half, size, size);
    }
}

// =============================================================
// Gesture previews
// =============================================================

fn draw_preview(
    ctx: &CanvasRenderingContext2d,
    input: &InputState,
    doc: &DocStore,
    style: &Style,
    zoom: f64,
) -> Result<(), JsValue> {
    match input {
        InputState::Drawing { points } => {
            let preview = PathShape {
                points: points.clone(),
                stroke_color: style.stroke_color.clone(),
                stroke_width: style.stroke_width,
                opacity: style.opacity,
            };
            draw_path(ctx, &preview);
            Ok(())
        }
        InputState::Sketching { tool, start, current } => {
            ctx.save();
            apply_stroke_style(ctx, &style.stroke_color, style.stroke_width);
            set_dash(ctx, DASH_PX / zoom)?;
            ctx.begin_path();
            match tool {
                Tool::Line => {
                    ctx.move_to(start.x, start.y);
                    ctx.line_to(current.x, current.y);
                }
                Tool::Ellipse => {
                    let b = Bounds::from_points(*start, *current);
                    let c = b.center();
                    ctx.ellipse(c.x, c.y, b.width / 2.0, b.height / 2.0, 0.0, 0.0, 2.0 * PI)?;
                }
                _ => {
                    let b = Bounds::from_points(*start, *current);
                    ctx.rect(b.x, b.y, b.width, b.height);
                }
            }
            ctx.stroke();
            clear_dash(ctx)?;
            ctx.restore();
            Ok(())
        }
        InputState::Connecting { from, current } => {
            let Some(origin) = doc.get(*from).and_then(|o| shape_bounds(&o.shape)).map(|b| b.center()) else {
                return Ok(());
            };
            draw_dashed_segment(ctx, origin, *current, &style.stroke_color, zoom)
        }
        InputState::Idle
        | InputState::Panning { .. }
        | InputState::Dragging { .. }
        | InputState::Resizing { .. } => Ok(()),
    }
}

fn draw_dashed_segment(
    ctx: &CanvasRenderingContext2d,
    from: Point,
    to: Point,
    color: &str,
    zoom: f64,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(1.5 / zoom);
    set_dash(ctx, DASH_PX / zoom)?;
    ctx.begin_path();
    ctx.move_to(from.x, from.y);
    ctx.line_to(to.x, to.y);
    ctx.stroke();
    clear_dash(ctx)?;
    ctx.restore();
    Ok(())
}

// =============================================================
// Helpers
// =============================================================

fn apply_stroke_style(ctx: &CanvasRenderingContext2d, color: &str, width: f64) {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(width);
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
}

fn set_dash(ctx: &CanvasRenderingContext2d, segment: f64) -> Result<(), JsValue> {
    let dash_array = js_sys::Array::new();
    dash_array.push(&segment.into());
    dash_array.push(&segment.into());
    ctx.set_line_dash(&dash_array)
}

fn clear_dash(ctx: &CanvasRenderingContext2d) -> Result<(), JsValue> {
    ctx.set_line_dash(&js_sys::Array::new())
}
