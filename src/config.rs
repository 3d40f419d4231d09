//! Editor configuration supplied by the host page.
//!
//! Every field is optional in the JSON form and falls back to the constants
//! in [`crate::consts`]. Values are range-checked once, at parse time, so the
//! engine can use them without further validation.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    BUTTON_ZOOM_FACTOR, HANDLE_SIZE_PX, HISTORY_LIMIT, HIT_MARGIN_PX, MAX_IMAGE_DIMENSION, MAX_UPLOAD_BYTES,
    MAX_ZOOM, MIN_ZOOM, WHEEL_ZOOM_FACTOR,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid editor config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid editor config: {field} {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum retained undo snapshots.
    pub history_limit: usize,
    /// Largest accepted image upload, in bytes.
    pub max_upload_bytes: u64,
    /// Longest side of a freshly placed image, in world units.
    pub max_image_dimension: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom multiplier per wheel notch.
    pub wheel_zoom_factor: f64,
    /// Zoom multiplier for the zoom buttons.
    pub button_zoom_factor: f64,
    /// Hit slop around shapes, in screen pixels.
    pub hit_margin_px: f64,
    /// Corner handle size, in screen pixels.
    pub handle_size_px: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            max_image_dimension: MAX_IMAGE_DIMENSION,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            wheel_zoom_factor: WHEEL_ZOOM_FACTOR,
            button_zoom_factor: BUTTON_ZOOM_FACTOR,
            hit_margin_px: HIT_MARGIN_PX,
            handle_size_px: HANDLE_SIZE_PX,
        }
    }
}

impl EditorConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed input and `Invalid` for out-of-range values.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.history_limit == 0 {
            return invalid("historyLimit", "must be at least 1");
        }
        if self.max_upload_bytes == 0 {
            return invalid("maxUploadBytes", "must be positive");
        }
        if !is_positive(self.max_image_dimension) {
            return invalid("maxImageDimension", "must be positive");
        }
        if !is_positive(self.min_zoom) {
            return invalid("minZoom", "must be positive");
        }
        if self.max_zoom.is_nan() || self.max_zoom < self.min_zoom {
            return invalid("maxZoom", "must not be below minZoom");
        }
        if !is_positive(self.wheel_zoom_factor - 1.0) {
            return invalid("wheelZoomFactor", "must be greater than 1");
        }
        if !is_positive(self.button_zoom_factor - 1.0) {
            return invalid("buttonZoomFactor", "must be greater than 1");
        }
        if self.hit_margin_px.is_nan() || self.hit_margin_px < 0.0 {
            return invalid("hitMarginPx", "must not be negative");
        }
        if !is_positive(self.handle_size_px) {
            return invalid("handleSizePx", "must be positive");
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
