//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 5.0;

/// Zoom multiplier applied per wheel notch.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;

/// Zoom multiplier applied by the zoom-in / zoom-out buttons.
pub const BUTTON_ZOOM_FACTOR: f64 = 1.2;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space slop in pixels added around shapes and thin strokes.
pub const HIT_MARGIN_PX: f64 = 10.0;

/// Side length of a corner resize handle in screen pixels.
pub const HANDLE_SIZE_PX: f64 = 12.0;

/// Normalized-distance threshold for ellipse hits. Values above 1.0 widen the target.
pub const ELLIPSE_HIT_THRESHOLD: f64 = 1.5;

// ── Shapes ──────────────────────────────────────────────────────

/// Minimum drag extent in world units before a shape is committed.
pub const MIN_DRAG_EXTENT: f64 = 2.0;

/// Minimum rect/image side length while resizing.
pub const MIN_BOX_SIZE: f64 = 20.0;

/// Minimum ellipse radius on create and resize.
pub const MIN_RADIUS: f64 = 10.0;

/// Font size bounds applied when resizing text.
pub const MIN_FONT_SIZE: f64 = 8.0;
pub const MAX_FONT_SIZE: f64 = 200.0;

/// Approximate glyph advance as a fraction of the font size.
pub const TEXT_CHAR_WIDTH_RATIO: f64 = 0.6;

/// Line height as a fraction of the font size.
pub const TEXT_LINE_HEIGHT_RATIO: f64 = 1.2;

/// Largest object id accepted from saved data (2^53 - 1, exact in JS numbers).
pub const MAX_OBJECT_ID: u64 = (1 << 53) - 1;

// ── Connectors ──────────────────────────────────────────────────

/// Arrowhead length in world units.
pub const ARROW_SIZE: f64 = 12.0;

/// Arrowhead half-angle in radians (30°).
pub const ARROW_ANGLE: f64 = std::f64::consts::PI / 6.0;

// ── History / images ────────────────────────────────────────────

/// Maximum number of retained history snapshots.
pub const HISTORY_LIMIT: usize = 50;

/// Largest accepted image upload in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Longest side, in world units, of a freshly placed image.
pub const MAX_IMAGE_DIMENSION: f64 = 400.0;
