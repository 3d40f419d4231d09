#![allow(clippy::float_cmp)]

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use super::*;
use crate::router;

// =============================================================
// Helpers
// =============================================================

fn engine() -> EngineCore {
    let mut core = EngineCore::new();
    core.set_viewport(800.0, 600.0, 1.0);
    core
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn no_modifiers() -> Modifiers {
    Modifiers::default()
}

fn shift_modifier() -> Modifiers {
    Modifiers { shift: true, ..Default::default() }
}

fn ctrl_modifier() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

fn key(name: &str) -> Key {
    Key(name.into())
}

fn click(core: &mut EngineCore, at: Point, modifiers: Modifiers) -> Vec<Action> {
    let mut actions = core.on_pointer_down(at, Button::Primary, modifiers);
    actions.extend(core.on_pointer_up(at, Button::Primary, modifiers));
    actions
}

fn drag(core: &mut EngineCore, from: Point, to: Point) -> Vec<Action> {
    let mut actions = core.on_pointer_down(from, Button::Primary, no_modifiers());
    actions.extend(core.on_pointer_move(to, no_modifiers()));
    actions.extend(core.on_pointer_up(to, Button::Primary, no_modifiers()));
    actions
}

fn draw_rect(core: &mut EngineCore, from: Point, to: Point) -> Vec<Action> {
    core.set_tool(Tool::Rect);
    drag(core, from, to)
}

fn add_rect(core: &mut EngineCore, x: f64, y: f64, w: f64, h: f64) -> ObjectId {
    core.doc.insert(Shape::Rect(RectShape {
        x,
        y,
        width: w,
        height: h,
        stroke_color: "#000000".into(),
        fill_color: "#ffffff".into(),
        fill_enabled: false,
        stroke_width: 2.0,
        opacity: 1.0,
    }))
}

fn add_text(core: &mut EngineCore, x: f64, y: f64, text: &str, font_size: f64) -> ObjectId {
    core.doc.insert(Shape::Text(TextShape {
        x,
        y,
        text: text.into(),
        font_size,
        stroke_color: "#000000".into(),
        opacity: 1.0,
    }))
}

fn rect_of(core: &EngineCore, id: ObjectId) -> RectShape {
    match core.object(id).map(|o| &o.shape) {
        Some(Shape::Rect(r)) => r.clone(),
        other => panic!("expected rect, got {other:?}"),
    }
}

fn saved(actions: &[Action]) -> bool {
    actions.iter().any(|a| matches!(a, Action::SaveRequested(_)))
}

fn kinds(core: &EngineCore) -> Vec<ObjectKind> {
    core.objects().iter().map(|o| o.shape.kind()).collect()
}

fn png_data_uri(width: u32, height: u32) -> String {
    let img = ::image::RgbaImage::new(width, height);
    let mut buf = Vec::new();
    ::image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ::image::ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(&buf))
}

// =============================================================
// Creation tools
// =============================================================

#[test]
fn rect_drag_commits_normalized_rect() {
    let mut core = engine();
    let actions = draw_rect(&mut core, pt(110.0, 60.0), pt(10.0, 10.0));
    assert!(saved(&actions));
    assert_eq!(core.objects().len(), 1);
    let r = rect_of(&core, core.objects()[0].id);
    assert_eq!((r.x, r.y, r.width, r.height), (10.0, 10.0, 100.0, 50.0));
}

#[test]
fn tiny_rect_drag_commits_nothing() {
    let mut core = engine();
    let actions = draw_rect(&mut core, pt(10.0, 10.0), pt(11.0, 11.0));
    assert!(!saved(&actions));
    assert!(core.objects().is_empty());
    assert!(!core.can_undo());
}

#[test]
fn rect_needs_extent_on_both_axes() {
    let mut core = engine();
    draw_rect(&mut core, pt(10.0, 10.0), pt(200.0, 12.0));
    assert!(core.objects().is_empty());
}

#[test]
fn line_needs_extent_on_either_axis() {
    let mut core = engine();
    core.set_tool(Tool::Line);
    drag(&mut core, pt(10.0, 10.0), pt(12.0, 11.0));
    assert!(core.objects().is_empty());

    drag(&mut core, pt(10.0, 10.0), pt(13.0, 10.0));
    let Some(Shape::Line(l)) = core.objects().first().map(|o| &o.shape) else {
        panic!("expected line");
    };
    assert_eq!((l.x, l.y, l.x2, l.y2), (10.0, 10.0, 13.0, 10.0));
}

#[test]
fn ellipse_is_centered_with_floored_radii() {
    let mut core = engine();
    core.set_tool(Tool::Ellipse);
    drag(&mut core, pt(0.0, 0.0), pt(10.0, 100.0));
    let Some(Shape::Ellipse(e)) = core.objects().first().map(|o| &o.shape) else {
        panic!("expected ellipse");
    };
    assert_eq!((e.x, e.y), (5.0, 50.0));
    assert_eq!(e.radius_x, 10.0);
    assert_eq!(e.radius_y, 50.0);
}

#[test]
fn freehand_needs_two_points() {
    let mut core = engine();
    core.set_tool(Tool::Draw);
    click(&mut core, pt(5.0, 5.0), no_modifiers());
    assert!(core.objects().is_empty());

    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(4.0, 4.0), no_modifiers());
    core.on_pointer_up(pt(4.0, 4.0), Button::Primary, no_modifiers());
    let Some(Shape::Path(p)) = core.objects().first().map(|o| &o.shape) else {
        panic!("expected path");
    };
    assert_eq!(p.points, vec![pt(0.0, 0.0), pt(4.0, 4.0)]);
}

#[test]
fn new_objects_use_the_current_style_and_clear_selection() {
    let mut core = engine();
    let existing = add_rect(&mut core, 500.0, 500.0, 50.0, 50.0);
    core.ui.selected = vec![existing];
    core.ui.style.stroke_color = "#ff0000".into();
    core.ui.style.fill_enabled = true;

    core.ui.tool = Tool::Rect;
    drag(&mut core, pt(0.0, 0.0), pt(40.0, 40.0));
    let created = core.objects().last().map(|o| o.id).unwrap();
    let r = rect_of(&core, created);
    assert_eq!(r.stroke_color, "#ff0000");
    assert!(r.fill_enabled);
    assert!(core.selection().is_empty());
}

#[test]
fn sketch_preview_tracks_pointer() {
    let mut core = engine();
    core.set_tool(Tool::Rect);
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(30.0, 40.0), no_modifiers());
    assert!(matches!(core.input, InputState::Sketching { current, .. } if current == pt(30.0, 40.0)));
}

// =============================================================
// Selection and dragging
// =============================================================

#[test]
fn click_selects_topmost_object() {
    let mut core = engine();
    let below = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let above = add_rect(&mut core, 50.0, 50.0, 100.0, 100.0);
    click(&mut core, pt(75.0, 75.0), no_modifiers());
    assert_eq!(core.selection(), &[above]);
    click(&mut core, pt(10.0, 10.0), no_modifiers());
    assert_eq!(core.selection(), &[below]);
}

#[test]
fn click_on_empty_space_clears_selection_unless_shift() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    click(&mut core, pt(50.0, 50.0), no_modifiers());
    click(&mut core, pt(500.0, 500.0), shift_modifier());
    assert_eq!(core.selection(), &[a]);
    click(&mut core, pt(500.0, 500.0), no_modifiers());
    assert!(core.selection().is_empty());
}

#[test]
fn shift_click_toggles_membership() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let b = add_rect(&mut core, 200.0, 0.0, 100.0, 100.0);
    click(&mut core, pt(50.0, 50.0), no_modifiers());
    click(&mut core, pt(250.0, 50.0), shift_modifier());
    assert_eq!(core.selection(), &[a, b]);
    click(&mut core, pt(50.0, 50.0), shift_modifier());
    assert_eq!(core.selection(), &[b]);
}

#[test]
fn dragging_moves_the_whole_selection() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let b = add_rect(&mut core, 200.0, 0.0, 100.0, 100.0);
    core.ui.selected = vec![a, b];

    let actions = drag(&mut core, pt(250.0, 50.0), pt(270.0, 80.0));
    assert!(saved(&actions));
    assert_eq!(core.selection(), &[a, b]);
    let ra = rect_of(&core, a);
    let rb = rect_of(&core, b);
    assert_eq!((ra.x, ra.y), (20.0, 30.0));
    assert_eq!((rb.x, rb.y), (220.0, 30.0));
}

#[test]
fn drag_uses_cumulative_delta() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(60.0, 60.0), no_modifiers());
    core.on_pointer_move(pt(70.0, 70.0), no_modifiers());
    core.on_pointer_move(pt(55.0, 45.0), no_modifiers());
    core.on_pointer_up(pt(55.0, 45.0), Button::Primary, no_modifiers());
    let r = rect_of(&core, a);
    assert_eq!((r.x, r.y), (5.0, -5.0));
}

#[test]
fn click_without_motion_commits_nothing() {
    let mut core = engine();
    add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let actions = click(&mut core, pt(50.0, 50.0), no_modifiers());
    assert!(!saved(&actions));
    assert!(!core.can_undo());
}

#[test]
fn dragging_lines_and_paths_moves_every_point() {
    let mut core = engine();
    core.set_tool(Tool::Line);
    drag(&mut core, pt(0.0, 0.0), pt(100.0, 0.0));
    core.set_tool(Tool::Select);
    drag(&mut core, pt(50.0, 0.0), pt(50.0, 10.0));
    let Some(Shape::Line(l)) = core.objects().first().map(|o| &o.shape) else {
        panic!("expected line");
    };
    assert_eq!((l.x, l.y, l.x2, l.y2), (0.0, 10.0, 100.0, 10.0));
}

#[test]
fn hover_cursor_reflects_hit() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    assert_eq!(core.on_pointer_move(pt(50.0, 50.0), no_modifiers()), vec![Action::SetCursor("move".into())]);
    assert_eq!(core.on_pointer_move(pt(400.0, 400.0), no_modifiers()), vec![Action::SetCursor("default".into())]);
    core.ui.selected = vec![a];
    assert_eq!(
        core.on_pointer_move(pt(100.0, 100.0), no_modifiers()),
        vec![Action::SetCursor("nwse-resize".into())]
    );
}

// =============================================================
// Resizing
// =============================================================

#[test]
fn shrinking_a_rect_clamps_width_to_exactly_twenty() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    core.ui.selected = vec![a];

    let actions = drag(&mut core, pt(100.0, 100.0), pt(-50.0, 100.0));
    assert!(saved(&actions));
    let r = rect_of(&core, a);
    assert_eq!(r.width, 20.0);
    assert_eq!(r.height, 100.0);
    assert_eq!((r.x, r.y), (0.0, 0.0));
}

#[test]
fn west_corner_keeps_opposite_corner_fixed() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    core.ui.selected = vec![a];

    drag(&mut core, pt(0.0, 0.0), pt(200.0, 10.0));
    let r = rect_of(&core, a);
    assert_eq!(r.width, 20.0);
    assert_eq!(r.height, 90.0);
    assert_eq!((r.x, r.y), (80.0, 10.0));
    assert_eq!((r.x + r.width, r.y + r.height), (100.0, 100.0));
}

#[test]
fn ellipse_resize_keeps_center() {
    let mut core = engine();
    let id = core.doc.insert(Shape::Ellipse(EllipseShape {
        x: 100.0,
        y: 100.0,
        radius_x: 50.0,
        radius_y: 30.0,
        stroke_color: "#000000".into(),
        fill_color: "#ffffff".into(),
        fill_enabled: false,
        stroke_width: 2.0,
        opacity: 1.0,
    }));
    core.ui.selected = vec![id];

    // SE handle sits at (150, 130).
    drag(&mut core, pt(150.0, 130.0), pt(170.0, 140.0));
    let Some(Shape::Ellipse(e)) = core.object(id).map(|o| &o.shape) else {
        panic!("expected ellipse");
    };
    assert_eq!((e.x, e.y), (100.0, 100.0));
    assert_eq!(e.radius_x, 60.0);
    assert_eq!(e.radius_y, 35.0);

    // NW handle drags inward past the minimum.
    drag(&mut core, pt(40.0, 65.0), pt(200.0, 200.0));
    let Some(Shape::Ellipse(e)) = core.object(id).map(|o| &o.shape) else {
        panic!("expected ellipse");
    };
    assert_eq!(e.radius_x, 10.0);
    assert_eq!(e.radius_y, 10.0);
}

#[test]
fn text_resize_scales_font_size() {
    let mut core = engine();
    // "abcd" at 20px: 48 wide, 24 tall.
    let id = add_text(&mut core, 0.0, 0.0, "abcd", 20.0);
    core.ui.selected = vec![id];

    drag(&mut core, pt(48.0, 24.0), pt(96.0, 24.0));
    let Some(Shape::Text(t)) = core.object(id).map(|o| &o.shape) else {
        panic!("expected text");
    };
    assert_eq!(t.font_size, 40.0);
    assert_eq!((t.x, t.y), (0.0, 0.0));
}

#[test]
fn text_resize_clamps_font_size_and_pins_opposite_corner() {
    let mut core = engine();
    let id = add_text(&mut core, 0.0, 0.0, "abcd", 20.0);
    core.ui.selected = vec![id];

    // Drag NW corner far inward: font shrinks to the minimum, SE corner stays at (48, 24).
    drag(&mut core, pt(0.0, 0.0), pt(47.0, 23.0));
    let Some(Shape::Text(t)) = core.object(id).map(|o| &o.shape) else {
        panic!("expected text");
    };
    assert_eq!(t.font_size, 8.0);
    let (w, h) = crate::geometry::text_extent(&t.text, t.font_size);
    assert!((t.x + w - 48.0).abs() < 1e-9);
    assert!((t.y + h - 24.0).abs() < 1e-9);
}

#[test]
fn handles_only_apply_to_selected_objects() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    // Corner of an unselected rect is a body hit: drag moves it instead of resizing.
    drag(&mut core, pt(100.0, 100.0), pt(110.0, 100.0));
    let r = rect_of(&core, a);
    assert_eq!((r.x, r.width), (10.0, 100.0));
}

// =============================================================
// Connectors
// =============================================================

#[test]
fn connect_tool_links_two_objects() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let b = add_rect(&mut core, 300.0, 0.0, 100.0, 100.0);
    core.set_tool(Tool::Connect);
    let actions = drag(&mut core, pt(50.0, 50.0), pt(350.0, 50.0));
    assert!(saved(&actions));

    let Some(Shape::Connector(c)) = core.objects().last().map(|o| &o.shape) else {
        panic!("expected connector");
    };
    assert_eq!((c.from_id, c.to_id), (a, b));
    let anchors = router::resolve(c, &core.doc).unwrap();
    assert_eq!(anchors.from, pt(100.0, 50.0));
    assert_eq!(anchors.to, pt(300.0, 50.0));
}

#[test]
fn connect_cancels_on_empty_space_or_same_object() {
    let mut core = engine();
    add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    core.set_tool(Tool::Connect);
    assert!(!saved(&drag(&mut core, pt(50.0, 50.0), pt(500.0, 500.0))));
    assert!(!saved(&drag(&mut core, pt(50.0, 50.0), pt(60.0, 60.0))));
    assert!(!saved(&drag(&mut core, pt(500.0, 500.0), pt(50.0, 50.0))));
    assert_eq!(core.objects().len(), 1);
    assert!(core.input.is_idle());
}

#[test]
fn connectors_cannot_attach_to_connectors() {
    let mut core = engine();
    add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    add_rect(&mut core, 300.0, 0.0, 100.0, 100.0);
    core.set_tool(Tool::Connect);
    drag(&mut core, pt(50.0, 50.0), pt(350.0, 50.0));
    // Start on the connector line between the boxes: nothing to connect from.
    let actions = core.on_pointer_down(pt(200.0, 50.0), Button::Primary, no_modifiers());
    assert!(actions.is_empty());
    assert!(core.input.is_idle());
}

#[test]
fn dragging_only_a_connector_commits_nothing() {
    let mut core = engine();
    add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    add_rect(&mut core, 300.0, 0.0, 100.0, 100.0);
    core.set_tool(Tool::Connect);
    drag(&mut core, pt(50.0, 50.0), pt(350.0, 50.0));
    core.set_tool(Tool::Select);
    let before = core.doc.snapshot();

    let actions = drag(&mut core, pt(200.0, 50.0), pt(200.0, 90.0));
    assert_eq!(core.selection().len(), 1);
    assert!(!saved(&actions));
    assert_eq!(core.doc.snapshot(), before);

    // The only history step is the connector itself.
    core.undo();
    assert!(core.objects().is_empty());
}

#[test]
fn deleting_an_endpoint_cascades_to_connectors() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let b = add_rect(&mut core, 300.0, 0.0, 100.0, 100.0);
    core.set_tool(Tool::Connect);
    drag(&mut core, pt(50.0, 50.0), pt(350.0, 50.0));
    core.set_tool(Tool::Select);

    click(&mut core, pt(50.0, 50.0), no_modifiers());
    let actions = core.on_key_down(&key("Delete"), no_modifiers());
    assert_eq!(core.objects().iter().map(|o| o.id).collect::<Vec<_>>(), vec![b]);

    let Some(Action::SaveRequested(objects)) = actions.iter().find(|a| matches!(a, Action::SaveRequested(_))) else {
        panic!("expected save");
    };
    assert!(objects.iter().all(|o| !o.shape.references(a)));
}

// =============================================================
// History
// =============================================================

#[test]
fn draw_path_and_rect_then_undo_twice() {
    let mut core = engine();
    core.set_tool(Tool::Draw);
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(5.0, 5.0), no_modifiers());
    core.on_pointer_move(pt(10.0, 0.0), no_modifiers());
    core.on_pointer_up(pt(10.0, 0.0), Button::Primary, no_modifiers());
    draw_rect(&mut core, pt(50.0, 50.0), pt(150.0, 150.0));
    assert_eq!(kinds(&core), vec![ObjectKind::Path, ObjectKind::Rect]);

    core.undo();
    assert_eq!(kinds(&core), vec![ObjectKind::Path]);
    let Some(Shape::Path(p)) = core.objects().first().map(|o| &o.shape) else {
        panic!("expected path");
    };
    assert_eq!(p.points.len(), 3);

    core.undo();
    assert!(core.objects().is_empty());
}

#[test]
fn undo_then_redo_restores_every_state() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    draw_rect(&mut core, pt(200.0, 0.0), pt(300.0, 100.0));
    draw_rect(&mut core, pt(400.0, 0.0), pt(500.0, 100.0));
    core.set_tool(Tool::Select);
    drag(&mut core, pt(50.0, 50.0), pt(60.0, 250.0));
    core.on_key_down(&key("Delete"), no_modifiers());
    let final_state = core.doc.snapshot();
    assert_eq!(final_state.len(), 2);

    for _ in 0..5 {
        assert!(saved(&core.undo()));
    }
    assert!(core.objects().is_empty());
    assert!(core.undo().is_empty());

    for _ in 0..5 {
        core.redo();
    }
    assert_eq!(core.doc.snapshot(), final_state);
    assert!(core.redo().is_empty());
}

#[test]
fn new_mutation_after_undo_drops_redo() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    draw_rect(&mut core, pt(200.0, 0.0), pt(300.0, 100.0));
    core.undo();
    assert!(core.can_redo());
    draw_rect(&mut core, pt(0.0, 200.0), pt(100.0, 300.0));
    assert!(!core.can_redo());
}

#[test]
fn history_keeps_at_most_fifty_entries() {
    let mut core = engine();
    for i in 0..60 {
        let x = f64::from(i) * 10.0;
        draw_rect(&mut core, pt(x, 0.0), pt(x + 5.0, 5.0));
    }
    assert_eq!(core.objects().len(), 60);

    let mut steps = 0;
    while !core.undo().is_empty() {
        steps += 1;
    }
    assert_eq!(steps, 49);
    assert_eq!(core.objects().len(), 11);
}

#[test]
fn undo_clears_selection() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    core.set_tool(Tool::Select);
    drag(&mut core, pt(50.0, 50.0), pt(80.0, 50.0));
    assert!(!core.selection().is_empty());
    core.undo();
    assert!(core.selection().is_empty());
}

#[test]
fn ids_are_never_reused_after_undo() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    let first = core.objects()[0].id;
    core.undo();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    assert!(core.objects()[0].id > first);
}

// =============================================================
// Camera
// =============================================================

#[test]
fn wheel_zoom_keeps_point_under_cursor() {
    let mut core = engine();
    core.camera.pan_x = 40.0;
    core.camera.pan_y = -25.0;
    let anchor = pt(200.0, 150.0);
    let before = core.camera.screen_to_world(anchor);

    core.on_wheel(anchor, WheelDelta { dx: 0.0, dy: -100.0 }, no_modifiers());
    assert!((core.camera.zoom - 1.1).abs() < 1e-12);
    let after = core.camera.screen_to_world(anchor);
    assert!((before.x - after.x).abs() < 1e-9);
    assert!((before.y - after.y).abs() < 1e-9);

    core.on_wheel(anchor, WheelDelta { dx: 0.0, dy: 100.0 }, no_modifiers());
    assert!((core.camera.zoom - 1.0).abs() < 1e-12);
}

#[test]
fn zoom_is_clamped() {
    let mut core = engine();
    for _ in 0..100 {
        core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -1.0 }, no_modifiers());
    }
    assert_eq!(core.camera.zoom, 5.0);
    for _ in 0..100 {
        core.zoom_out();
    }
    assert_eq!(core.camera.zoom, 0.1);
}

#[test]
fn inverted_zoom_range_is_rejected_at_construction() {
    let config = EditorConfig { min_zoom: 5.0, max_zoom: 0.1, ..EditorConfig::default() };
    let err = EngineCore::with_config(config).err().unwrap();
    assert!(matches!(err, ConfigError::Invalid { field: "maxZoom", .. }));

    let config = EditorConfig { min_zoom: 0.5, max_zoom: 2.0, ..EditorConfig::default() };
    let mut core = EngineCore::with_config(config).unwrap();
    core.set_viewport(800.0, 600.0, 1.0);
    for _ in 0..50 {
        core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -1.0 }, no_modifiers());
    }
    assert_eq!(core.camera.zoom, 2.0);
    for _ in 0..50 {
        core.zoom_out();
    }
    assert_eq!(core.camera.zoom, 0.5);
    assert_eq!(core.config().max_zoom, 2.0);
}

#[test]
fn zoom_buttons_anchor_at_viewport_center() {
    let mut core = engine();
    let center = pt(400.0, 300.0);
    let before = core.camera.screen_to_world(center);
    core.zoom_in();
    assert!((core.camera.zoom - 1.2).abs() < 1e-12);
    let after = core.camera.screen_to_world(center);
    assert!((before.x - after.x).abs() < 1e-9);
    assert!((before.y - after.y).abs() < 1e-9);

    core.reset_view();
    assert_eq!(core.camera(), Camera::default());
}

#[test]
fn middle_button_pans_in_any_tool() {
    let mut core = engine();
    core.set_tool(Tool::Rect);
    let down = core.on_pointer_down(pt(100.0, 100.0), Button::Middle, no_modifiers());
    assert_eq!(down, vec![Action::SetCursor("grabbing".into())]);
    core.on_pointer_move(pt(130.0, 90.0), no_modifiers());
    core.on_pointer_up(pt(130.0, 90.0), Button::Middle, no_modifiers());
    assert_eq!((core.camera.pan_x, core.camera.pan_y), (30.0, -10.0));
    assert!(core.objects().is_empty());
}

#[test]
fn pan_tool_pans_independent_of_zoom() {
    let mut core = engine();
    core.camera.zoom = 2.0;
    core.set_tool(Tool::Pan);
    drag(&mut core, pt(0.0, 0.0), pt(50.0, 20.0));
    assert_eq!((core.camera.pan_x, core.camera.pan_y), (50.0, 20.0));
}

#[test]
fn shapes_are_created_in_world_coordinates() {
    let mut core = engine();
    core.camera.zoom = 2.0;
    core.camera.pan_x = 100.0;
    draw_rect(&mut core, pt(100.0, 0.0), pt(300.0, 100.0));
    let r = rect_of(&core, core.objects()[0].id);
    assert_eq!((r.x, r.y, r.width, r.height), (0.0, 0.0, 100.0, 50.0));
}

// =============================================================
// Text
// =============================================================

#[test]
fn text_tool_requests_editor_then_commits() {
    let mut core = engine();
    core.set_tool(Tool::Text);
    let actions = core.on_pointer_down(pt(40.0, 50.0), Button::Primary, no_modifiers());
    assert_eq!(
        actions,
        vec![Action::EditTextRequested { id: None, at: pt(40.0, 50.0), text: String::new(), font_size: 20.0 }]
    );

    let actions = core.commit_text("hello\nworld");
    assert!(saved(&actions));
    let Some(Shape::Text(t)) = core.objects().first().map(|o| &o.shape) else {
        panic!("expected text");
    };
    assert_eq!((t.x, t.y), (40.0, 50.0));
    assert_eq!(t.text, "hello\nworld");
    assert!(core.ui.text_edit.is_none());
}

#[test]
fn blank_new_text_is_discarded() {
    let mut core = engine();
    core.set_tool(Tool::Text);
    core.on_pointer_down(pt(40.0, 50.0), Button::Primary, no_modifiers());
    assert!(!saved(&core.commit_text("   ")));
    assert!(core.objects().is_empty());
}

#[test]
fn cancel_text_discards_the_edit() {
    let mut core = engine();
    core.set_tool(Tool::Text);
    core.on_pointer_down(pt(40.0, 50.0), Button::Primary, no_modifiers());
    core.cancel_text();
    assert!(core.commit_text("late").is_empty());
    assert!(core.objects().is_empty());
}

#[test]
fn double_click_reopens_text_and_commit_updates_it() {
    let mut core = engine();
    let id = add_text(&mut core, 40.0, 50.0, "hello", 24.0);
    let actions = core.on_double_click(pt(50.0, 60.0));
    assert_eq!(
        actions,
        vec![Action::EditTextRequested { id: Some(id), at: pt(40.0, 50.0), text: "hello".into(), font_size: 24.0 }]
    );

    assert!(!saved(&core.commit_text("hello")));

    core.on_double_click(pt(50.0, 60.0));
    assert!(saved(&core.commit_text("goodbye")));
    let Some(Shape::Text(t)) = core.object(id).map(|o| &o.shape) else {
        panic!("expected text");
    };
    assert_eq!(t.text, "goodbye");
}

#[test]
fn clearing_existing_text_deletes_it() {
    let mut core = engine();
    let id = add_text(&mut core, 40.0, 50.0, "hello", 24.0);
    core.ui.selected = vec![id];
    core.on_double_click(pt(50.0, 60.0));
    assert!(saved(&core.commit_text("")));
    assert!(core.object(id).is_none());
    assert!(core.selection().is_empty());
}

#[test]
fn double_click_ignores_non_text() {
    let mut core = engine();
    add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    assert!(core.on_double_click(pt(50.0, 50.0)).is_empty());
}

// =============================================================
// Keyboard
// =============================================================

#[test]
fn undo_redo_shortcuts() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    core.on_key_down(&key("z"), ctrl_modifier());
    assert!(core.objects().is_empty());
    core.on_key_down(&key("Z"), Modifiers { ctrl: true, shift: true, ..Default::default() });
    assert_eq!(core.objects().len(), 1);
    core.on_key_down(&key("z"), Modifiers { meta: true, ..Default::default() });
    assert!(core.objects().is_empty());
    core.on_key_down(&key("y"), ctrl_modifier());
    assert_eq!(core.objects().len(), 1);
}

#[test]
fn select_all_and_escape() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let b = add_rect(&mut core, 200.0, 0.0, 100.0, 100.0);
    core.on_key_down(&key("a"), ctrl_modifier());
    assert_eq!(core.selection(), &[a, b]);
    core.on_key_down(&key("Escape"), no_modifiers());
    assert!(core.selection().is_empty());
}

#[test]
fn backspace_deletes_selection() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    core.ui.selected = vec![a];
    assert!(saved(&core.on_key_down(&key("Backspace"), no_modifiers())));
    assert!(core.objects().is_empty());
}

#[test]
fn delete_with_empty_selection_is_a_noop() {
    let mut core = engine();
    add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    assert!(core.on_key_down(&key("Delete"), no_modifiers()).is_empty());
    assert_eq!(core.objects().len(), 1);
}

#[test]
fn shortcuts_are_ignored_while_editing_text() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    core.ui.selected = vec![a];
    core.ui.text_edit = Some(TextEdit { id: None, at: pt(0.0, 0.0) });
    assert!(core.on_key_down(&key("Delete"), no_modifiers()).is_empty());
    assert_eq!(core.objects().len(), 1);
}

// =============================================================
// Tools and editing
// =============================================================

#[test]
fn switching_away_from_select_clears_selection() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    core.ui.selected = vec![a];
    core.set_tool(Tool::Select);
    assert_eq!(core.selection(), &[a]);
    let actions = core.set_tool(Tool::Rect);
    assert!(core.selection().is_empty());
    assert!(actions.contains(&Action::SetCursor("crosshair".into())));
}

#[test]
fn image_tool_opens_picker() {
    let mut core = engine();
    let actions = core.set_tool(Tool::Image);
    assert!(actions.contains(&Action::OpenImagePicker));
}

#[test]
fn set_tool_abandons_gesture() {
    let mut core = engine();
    core.set_tool(Tool::Rect);
    core.on_pointer_down(pt(0.0, 0.0), Button::Primary, no_modifiers());
    core.set_tool(Tool::Ellipse);
    assert!(core.input.is_idle());
    core.on_pointer_up(pt(100.0, 100.0), Button::Primary, no_modifiers());
    assert!(core.objects().is_empty());
}

#[test]
fn apply_style_updates_selection_and_defaults() {
    let mut core = engine();
    let a = add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let b = add_rect(&mut core, 200.0, 0.0, 100.0, 100.0);
    core.ui.selected = vec![a];

    let edit = StyleEdit { stroke_color: Some("#336699".into()), stroke_width: Some(5.0), ..Default::default() };
    assert!(saved(&core.apply_style(&edit)));
    assert_eq!(rect_of(&core, a).stroke_color, "#336699");
    assert_eq!(rect_of(&core, a).stroke_width, 5.0);
    assert_eq!(rect_of(&core, b).stroke_color, "#000000");
    assert_eq!(core.ui.style.stroke_color, "#336699");

    assert!(!saved(&core.apply_style(&edit)));
}

#[test]
fn apply_style_without_selection_only_changes_defaults() {
    let mut core = engine();
    add_rect(&mut core, 0.0, 0.0, 100.0, 100.0);
    let edit = StyleEdit { font_size: Some(32.0), ..Default::default() };
    assert!(core.apply_style(&edit).is_empty());
    assert_eq!(core.ui.style.font_size, 32.0);
}

#[test]
fn clear_removes_everything_and_is_undoable() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    draw_rect(&mut core, pt(200.0, 0.0), pt(300.0, 100.0));
    assert!(saved(&core.clear()));
    assert!(core.objects().is_empty());
    assert!(core.clear().is_empty());
    core.undo();
    assert_eq!(core.objects().len(), 2);
}

// =============================================================
// Images
// =============================================================

#[test]
fn placed_image_is_downscaled_and_centered() {
    let mut core = engine();
    let actions = core.place_image("data:image/png;base64,AAAA".into(), 800.0, 400.0);
    let Some(obj) = core.objects().first() else {
        panic!("expected image");
    };
    let Shape::Image(img) = &obj.shape else {
        panic!("expected image");
    };
    assert_eq!((img.width, img.height), (400.0, 200.0));
    assert_eq!((img.x, img.y), (200.0, 200.0));
    assert!(saved(&actions));
    assert!(actions.contains(&Action::DecodeImage { id: obj.id, source: "data:image/png;base64,AAAA".into() }));
    assert_eq!(core.image_status(obj.id), Some(ImageStatus::Pending));
}

#[test]
fn image_decoded_marks_handle_ready() {
    let mut core = engine();
    core.place_image("data:image/png;base64,AAAA".into(), 10.0, 10.0);
    let id = core.objects()[0].id;
    assert_eq!(core.image_decoded(id, 10, 10), vec![Action::RenderNeeded]);
    assert_eq!(core.image_status(id), Some(ImageStatus::Ready { width: 10, height: 10 }));
    assert!(core.image_decoded(id + 100, 1, 1).is_empty());
}

#[test]
fn image_with_unusable_size_is_ignored() {
    let mut core = engine();
    assert!(core.place_image("data:image/png;base64,AAAA".into(), 0.0, 10.0).is_empty());
    assert!(core.objects().is_empty());
}

#[test]
fn data_uri_placement_probes_dimensions() {
    let mut core = engine();
    let uri = png_data_uri(40, 30);
    core.place_image_data_uri(uri.clone()).unwrap();
    let Some(Shape::Image(img)) = core.objects().first().map(|o| &o.shape) else {
        panic!("expected image");
    };
    assert_eq!((img.width, img.height), (40.0, 30.0));
    assert_eq!(img.source, uri);
}

#[test]
fn undecodable_data_uri_creates_nothing() {
    let mut core = engine();
    assert!(core.place_image_data_uri("data:text/plain;base64,aGVsbG8=".into()).is_err());
    assert!(core.place_image_data_uri("not a uri".into()).is_err());
    assert!(core.objects().is_empty());
}

#[test]
fn upload_guard_uses_configured_limit() {
    let core = engine();
    assert!(core.check_upload("image/png", 1024).is_ok());
    assert!(matches!(core.check_upload("image/png", 11 * 1024 * 1024), Err(ImageError::TooLarge { .. })));
    assert!(matches!(core.check_upload("text/plain", 10), Err(ImageError::NotAnImage { .. })));

    let config = EditorConfig { max_upload_bytes: 100, ..EditorConfig::default() };
    let small = EngineCore::with_config(config).unwrap();
    assert!(small.check_upload("image/png", 101).is_err());
}

#[test]
fn undo_redecodes_restored_images() {
    let mut core = engine();
    core.place_image("data:image/png;base64,AAAA".into(), 10.0, 10.0);
    let id = core.objects()[0].id;
    core.image_decoded(id, 10, 10);

    core.select_all();
    core.delete_selected();
    assert!(core.image_status(id).is_none());

    let actions = core.undo();
    assert!(actions.contains(&Action::DecodeImage { id, source: "data:image/png;base64,AAAA".into() }));
    assert_eq!(core.image_status(id), Some(ImageStatus::Pending));
}

// =============================================================
// Page load
// =============================================================

#[test]
fn load_page_replaces_scene_and_resets_history() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    let page = json!([
        { "id": 5, "type": "rect", "x": 0, "y": 0, "width": 100, "height": 100 },
        { "id": 9, "type": "image", "x": 0, "y": 0, "width": 10, "height": 10, "source": "data:image/png;base64,AAAA" },
    ]);
    let (actions, report) = core.load_page(Some(&page)).unwrap();
    assert_eq!(report, LoadReport { loaded: 2, skipped: 0 });
    assert_eq!(core.objects().iter().map(|o| o.id).collect::<Vec<_>>(), vec![5, 9]);
    assert!(actions.contains(&Action::DecodeImage { id: 9, source: "data:image/png;base64,AAAA".into() }));
    assert!(!saved(&actions));
    assert!(!core.can_undo());

    draw_rect(&mut core, pt(300.0, 300.0), pt(400.0, 400.0));
    assert!(core.objects().last().unwrap().id >= 10);
    core.undo();
    assert_eq!(core.objects().len(), 2);
}

#[test]
fn load_page_with_null_is_empty() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    core.load_page(None).unwrap();
    assert!(core.objects().is_empty());
    core.load_page(Some(&Value::Null)).unwrap();
    assert!(core.objects().is_empty());
}

#[test]
fn non_array_page_leaves_scene_untouched() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    let err = core.load_page(Some(&json!("oops"))).unwrap_err();
    assert!(matches!(err, LoadError::NotAnArray));
    assert_eq!(core.objects().len(), 1);
    assert!(core.can_undo());
}

#[test]
fn load_page_skips_ids_past_the_exact_js_range() {
    let mut core = engine();
    let page = json!([
        { "id": 1, "type": "rect", "x": 0, "y": 0, "width": 100, "height": 100 },
        { "id": u64::MAX, "type": "rect", "x": 200, "y": 0, "width": 100, "height": 100 },
    ]);
    let (_, report) = core.load_page(Some(&page)).unwrap();
    assert_eq!(report, LoadReport { loaded: 1, skipped: 1 });

    draw_rect(&mut core, pt(300.0, 300.0), pt(400.0, 400.0));
    let ids: Vec<_> = core.objects().iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn canvas_data_round_trips_through_load() {
    let mut core = engine();
    draw_rect(&mut core, pt(0.0, 0.0), pt(100.0, 100.0));
    core.set_tool(Tool::Ellipse);
    drag(&mut core, pt(200.0, 200.0), pt(260.0, 240.0));
    let data = core.canvas_data().unwrap();

    let mut other = engine();
    other.load_page(Some(&data)).unwrap();
    assert_eq!(other.doc.snapshot(), core.doc.snapshot());
}
