//! Image intake and the decoded-image side table.
//!
//! Persisted image objects carry only their `source` data URI. Whatever the
//! renderer needs to actually draw them is runtime-only state, tracked here
//! per object id and rebuilt from `source` whenever image objects appear in
//! the scene (placement, page load, undo/redo).

#[cfg(test)]
#[path = "image_test.rs"]
mod image_test;

use std::collections::HashMap;
use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::doc::{DocStore, ObjectId, Shape};

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image is too large ({size} bytes). The maximum is {limit} bytes.")]
    TooLarge { size: u64, limit: u64 },
    #[error("Please choose an image file (got \"{mime}\").")]
    NotAnImage { mime: String },
    #[error("image source is not a base64 data URI")]
    InvalidDataUri,
    #[error("image data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to read image data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] ::image::ImageError),
}

/// Reject uploads that are not images or exceed `limit` bytes.
///
/// Only the declared MIME prefix is checked; content is not sniffed.
///
/// # Errors
///
/// Returns `NotAnImage` or `TooLarge`. The message is suitable for showing to the user.
pub fn check_upload(mime: &str, size: u64, limit: u64) -> Result<(), ImageError> {
    if !mime.starts_with("image/") {
        return Err(ImageError::NotAnImage { mime: mime.to_owned() });
    }
    if size > limit {
        return Err(ImageError::TooLarge { size, limit });
    }
    Ok(())
}

/// Split a `data:<mime>;base64,<payload>` URI into its MIME type and decoded bytes.
///
/// # Errors
///
/// Returns `InvalidDataUri` for anything other than a base64 data URI, or
/// `Base64` when the payload does not decode.
pub fn decode_data_uri(source: &str) -> Result<(String, Vec<u8>), ImageError> {
    let rest = source.strip_prefix("data:").ok_or(ImageError::InvalidDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageError::InvalidDataUri)?;
    let mime = header.strip_suffix(";base64").ok_or(ImageError::InvalidDataUri)?;
    let bytes = STANDARD.decode(payload.trim())?;
    Ok((mime.to_owned(), bytes))
}

/// Read the pixel dimensions of the image encoded in a data URI.
///
/// # Errors
///
/// Fails if the URI is malformed or the image header cannot be decoded.
pub fn probe_data_uri(source: &str) -> Result<(u32, u32), ImageError> {
    let (_mime, bytes) = decode_data_uri(source)?;
    let dims = ::image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(dims)
}

/// Uniformly scale `(width, height)` down so neither side exceeds `max`.
/// Images already within bounds keep their size.
#[must_use]
pub fn fit_within(width: f64, height: f64, max: f64) -> (f64, f64) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scale = (max / width).min(max / height);
    (width * scale, height * scale)
}

/// Decode state of one image object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    /// A decode has been requested and has not reported back yet.
    Pending,
    /// Decoded; natural pixel size.
    Ready { width: u32, height: u32 },
}

/// Runtime-only decode state for image objects, keyed by object id.
#[derive(Debug, Clone, Default)]
pub struct ImageTable {
    entries: HashMap<ObjectId, ImageStatus>,
}

impl ImageTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the table in line with the scene: forget ids that are no longer
    /// images in `doc` and return `(id, source)` for images that need decoding.
    pub fn reconcile(&mut self, doc: &DocStore) -> Vec<(ObjectId, String)> {
        let mut live = HashMap::new();
        let mut requests = Vec::new();
        for obj in doc.objects() {
            let Shape::Image(img) = &obj.shape else {
                continue;
            };
            let status = match self.entries.get(&obj.id) {
                Some(existing) => *existing,
                None => {
                    requests.push((obj.id, img.source.clone()));
                    ImageStatus::Pending
                }
            };
            live.insert(obj.id, status);
        }
        self.entries = live;
        requests
    }

    /// Record a finished decode. Returns false if the id is not tracked.
    pub fn mark_ready(&mut self, id: ObjectId, width: u32, height: u32) -> bool {
        match self.entries.get_mut(&id) {
            Some(status) => {
                *status = ImageStatus::Ready { width, height };
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn status(&self, id: ObjectId) -> Option<ImageStatus> {
        self.entries.get(&id).copied()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
