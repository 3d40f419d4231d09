//! Page `canvasData` codec.
//!
//! The host stores the scene as an opaque JSON array of objects. Loading is
//! lenient: entries are decoded one at a time and anything that would break
//! a scene invariant is dropped and reported instead of failing the page.

#[cfg(test)]
#[path = "persist_test.rs"]
mod persist_test;

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::consts::MAX_OBJECT_ID;
use crate::doc::{ObjectId, ObjectKind, SceneObject, Shape};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("canvasData must be an array of objects")]
    NotAnArray,
    #[error("canvasData is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of decoding a page: how many entries were kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Decode a page's `canvasData`. A missing or `null` value is an empty scene.
///
/// # Errors
///
/// Returns `NotAnArray` when the value is present but not an array.
pub fn decode_canvas_data(value: Option<&Value>) -> Result<(Vec<SceneObject>, LoadReport), LoadError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok((Vec::new(), LoadReport::default())),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(LoadError::NotAnArray),
    };

    let mut report = LoadReport::default();
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut objects = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        match SceneObject::deserialize(entry) {
            Ok(obj) if obj.id > MAX_OBJECT_ID => {
                warn!(index, id = obj.id, "skipping canvas object with out-of-range id");
                report.skipped += 1;
            }
            Ok(obj) if seen.insert(obj.id) => objects.push(obj),
            Ok(obj) => {
                warn!(index, id = obj.id, "skipping canvas object with duplicate id");
                report.skipped += 1;
            }
            Err(e) => {
                warn!(index, error = %e, "skipping malformed canvas object");
                report.skipped += 1;
            }
        }
    }

    let before = objects.len();
    objects = drop_dangling_connectors(objects);
    report.skipped += before - objects.len();
    report.loaded = objects.len();
    Ok((objects, report))
}

/// Parse a raw JSON string and decode it as `canvasData`.
///
/// # Errors
///
/// Returns `Json` when the text does not parse, otherwise as [`decode_canvas_data`].
pub fn decode_canvas_json(raw: &str) -> Result<(Vec<SceneObject>, LoadReport), LoadError> {
    let value: Value = serde_json::from_str(raw)?;
    decode_canvas_data(Some(&value))
}

/// Serialize the object list into the value stored as the page's `canvasData`.
///
/// # Errors
///
/// Propagates serializer failures, which do not occur for well-formed scenes.
pub fn to_canvas_data(objects: &[SceneObject]) -> Result<Value, serde_json::Error> {
    serde_json::to_value(objects)
}

fn drop_dangling_connectors(objects: Vec<SceneObject>) -> Vec<SceneObject> {
    let endpoints: HashSet<ObjectId> = objects
        .iter()
        .filter(|o| o.shape.kind() != ObjectKind::Connector)
        .map(|o| o.id)
        .collect();
    objects
        .into_iter()
        .filter(|o| match &o.shape {
            Shape::Connector(c) => {
                let ok = c.from_id != c.to_id && endpoints.contains(&c.from_id) && endpoints.contains(&c.to_id);
                if !ok {
                    warn!(id = o.id, from = c.from_id, to = c.to_id, "skipping connector with invalid endpoints");
                }
                ok
            }
            _ => true,
        })
        .collect()
}
