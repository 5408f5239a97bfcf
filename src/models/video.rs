//! Represents an uploaded video and the projections returned by the API.

use super::{format::VideoFormat, video_id::VideoId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::FromRow;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A persisted video: descriptive metadata plus the location of its binary.
///
/// The binary itself lives in the object store under `storage_key`; this
/// record only references it.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VideoRecord {
    /// Identifier assigned by the repository on insert.
    #[serde(rename = "_id")]
    pub id: VideoId,

    /// Caller-supplied display name.
    #[serde(rename = "nombreVideo")]
    pub display_name: String,

    /// Key of the binary in the object store (`videos/{uuid}_{filename}`).
    #[serde(rename = "s3_key")]
    pub storage_key: String,

    /// Public URL derived from the storage key.
    pub url: String,

    /// Byte length of the uploaded content.
    #[serde(rename = "tamaño_bytes")]
    pub size_bytes: i64,

    #[serde(rename = "formato")]
    pub format: VideoFormat,

    /// Caller-supplied anomaly classification.
    #[serde(rename = "anomalia")]
    pub flagged: bool,

    /// Insert time (UTC).
    #[serde(rename = "fecha_subida")]
    pub uploaded_at: DateTime<Utc>,

    #[serde(rename = "procesado")]
    pub processed: bool,

    /// Additional fields attached through updates.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The listing projection of a [`VideoRecord`].
#[derive(Serialize, Clone, Debug, PartialEq, FromRow)]
pub struct VideoSummary {
    #[serde(rename = "_id")]
    pub id: VideoId,
    #[serde(rename = "nombreVideo")]
    pub display_name: String,
    pub url: String,
    #[serde(rename = "anomalia")]
    pub flagged: bool,
    #[serde(rename = "fecha_subida")]
    pub uploaded_at: DateTime<Utc>,
}

/// Everything the repository needs to create a record; the id is assigned on insert.
#[derive(Clone, Debug)]
pub struct NewVideo {
    pub display_name: String,
    pub storage_key: String,
    pub url: String,
    pub size_bytes: i64,
    pub format: VideoFormat,
    pub flagged: bool,
    pub uploaded_at: DateTime<Utc>,
    pub processed: bool,
}

/// Response body returned after a successful upload.
#[derive(Serialize, Clone, Debug)]
pub struct CreatedVideo {
    #[serde(rename = "_id")]
    pub id: VideoId,
    #[serde(rename = "nombreVideo")]
    pub display_name: String,
    pub url: String,
    /// Human-readable size, e.g. `"1.23 MB"`.
    #[serde(rename = "tamaño")]
    pub size: String,
    #[serde(rename = "formato")]
    pub format: VideoFormat,
    #[serde(rename = "anomalia")]
    pub flagged: bool,
    #[serde(rename = "fecha_subida")]
    pub uploaded_at: DateTime<Utc>,
}

impl CreatedVideo {
    pub fn new(id: VideoId, video: &NewVideo) -> Self {
        Self {
            id,
            display_name: video.display_name.clone(),
            url: video.url.clone(),
            size: human_size(video.size_bytes),
            format: video.format,
            flagged: video.flagged,
            uploaded_at: video.uploaded_at,
        }
    }
}

/// Megabytes rounded to two decimals, always showing at least one decimal digit.
pub fn human_size(size_bytes: i64) -> String {
    let megabytes = (size_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0;
    if megabytes.fract() == 0.0 {
        format!("{:.1} MB", megabytes)
    } else {
        format!("{} MB", megabytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_size_rounds_to_two_decimals() {
        assert_eq!(human_size(10), "0.0 MB");
        assert_eq!(human_size(1024 * 1024), "1.0 MB");
        assert_eq!(human_size(1024 * 1024 * 3 / 2), "1.5 MB");
        assert_eq!(human_size(1_290_000), "1.23 MB");
    }

    #[test]
    fn record_serializes_with_api_field_names() {
        let mut extra = Map::new();
        extra.insert("camara".into(), Value::from("norte"));
        let record = VideoRecord {
            id: VideoId::parse("65f1c0ffee65f1c0ffee65f1").unwrap(),
            display_name: "lobby".into(),
            storage_key: "videos/k_lobby.mp4".into(),
            url: "https://b.s3.us-east-1.amazonaws.com/videos/k_lobby.mp4".into(),
            size_bytes: 42,
            format: VideoFormat::Mp4,
            flagged: true,
            uploaded_at: Utc::now(),
            processed: false,
            extra,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], "65f1c0ffee65f1c0ffee65f1");
        assert_eq!(json["nombreVideo"], "lobby");
        assert_eq!(json["s3_key"], "videos/k_lobby.mp4");
        assert_eq!(json["tamaño_bytes"], 42);
        assert_eq!(json["formato"], "mp4");
        assert_eq!(json["anomalia"], true);
        assert_eq!(json["procesado"], false);
        assert_eq!(json["camara"], "norte");
    }
}
