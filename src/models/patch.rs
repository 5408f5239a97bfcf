//! Partial updates to a video record.

use super::{format::VideoFormat, video::VideoRecord};
use serde_json::{Map, Value};

/// Keys that identify a record or its binary. They are dropped from every patch.
pub const PROTECTED_FIELDS: [&str; 7] = [
    "_id",
    "id",
    "s3_key",
    "storageKey",
    "url",
    "fecha_subida",
    "uploadedAt",
];

/// A validated patch.
///
/// Known fields are type-checked; any other key is carried in `extra` and
/// set on the record's additional fields, replacing the stored value whole.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoPatch {
    pub display_name: Option<String>,
    pub flagged: Option<bool>,
    pub processed: Option<bool>,
    pub format: Option<VideoFormat>,
    pub size_bytes: Option<i64>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{field}` {expected}")]
pub struct PatchError {
    pub field: String,
    pub expected: &'static str,
}

impl PatchError {
    fn new(field: &str, expected: &'static str) -> Self {
        Self {
            field: field.to_string(),
            expected,
        }
    }
}

impl VideoPatch {
    /// Strip protected keys and type-check the known ones.
    pub fn from_json(mut body: Map<String, Value>) -> Result<Self, PatchError> {
        for key in PROTECTED_FIELDS {
            body.remove(key);
        }

        let mut patch = VideoPatch::default();
        for (key, value) in body {
            match key.as_str() {
                "nombreVideo" | "displayName" => {
                    let name = value
                        .as_str()
                        .filter(|s| !s.trim().is_empty())
                        .ok_or_else(|| PatchError::new(&key, "must be a non-empty string"))?;
                    patch.display_name = Some(name.to_string());
                }
                "anomalia" | "flagged" => {
                    patch.flagged =
                        Some(value.as_bool().ok_or_else(|| PatchError::new(&key, "must be a boolean"))?);
                }
                "procesado" | "processed" => {
                    patch.processed =
                        Some(value.as_bool().ok_or_else(|| PatchError::new(&key, "must be a boolean"))?);
                }
                "formato" | "format" => {
                    let format = value
                        .as_str()
                        .and_then(|s| s.parse::<VideoFormat>().ok())
                        .ok_or_else(|| PatchError::new(&key, "must be one of the allowed formats"))?;
                    patch.format = Some(format);
                }
                "tamaño_bytes" | "sizeBytes" => {
                    let size = value
                        .as_i64()
                        .filter(|n| *n >= 0)
                        .ok_or_else(|| PatchError::new(&key, "must be a non-negative integer"))?;
                    patch.size_bytes = Some(size);
                }
                _ => {
                    patch.extra.insert(key, value);
                }
            }
        }

        Ok(patch)
    }

    /// Write the patch into `record` and report whether anything changed.
    ///
    /// An extra key replaces its stored value whole; `null` is stored as
    /// `null`, nested objects are not merged.
    pub fn apply_to(&self, record: &mut VideoRecord) -> bool {
        let mut changed = false;
        changed |= replace(&mut record.display_name, &self.display_name);
        changed |= replace(&mut record.flagged, &self.flagged);
        changed |= replace(&mut record.processed, &self.processed);
        changed |= replace(&mut record.format, &self.format);
        changed |= replace(&mut record.size_bytes, &self.size_bytes);
        for (key, value) in &self.extra {
            if record.extra.get(key) != Some(value) {
                record.extra.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.flagged.is_none()
            && self.processed.is_none()
            && self.format.is_none()
            && self.size_bytes.is_none()
            && self.extra.is_empty()
    }
}

fn replace<T: PartialEq + Clone>(field: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(value) if *field != *value => {
            *field = value.clone();
            true
        }
        _ => false,
    }
}
