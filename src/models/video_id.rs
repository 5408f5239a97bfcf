//! Identifier assigned to a video record when it is first persisted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::atomic::{AtomicU32, Ordering},
};
use uuid::Uuid;

/// Length of the hex rendering of a [`VideoId`].
pub const VIDEO_ID_HEX_LEN: usize = 24;

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// A 12-byte identifier rendered as 24 lowercase hex characters.
///
/// Layout: 4 bytes of big-endian UNIX seconds, 5 random bytes, and a
/// 3-byte process-wide counter. Ids sort roughly by creation time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct VideoId(String);

/// Returned by [`VideoId::parse`] for anything that is not 24 hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a valid video id")]
pub struct InvalidVideoId(pub String);

impl VideoId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        let seconds = Utc::now().timestamp() as u32;
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&Uuid::new_v4().as_bytes()[..5]);
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);

        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Validate the textual form of an identifier.
    ///
    /// Accepts upper- or lowercase hex and normalizes to lowercase.
    pub fn parse(raw: &str) -> Result<Self, InvalidVideoId> {
        if raw.len() != VIDEO_ID_HEX_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidVideoId(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_parse_back() {
        let id = VideoId::generate();
        assert_eq!(id.as_str().len(), VIDEO_ID_HEX_LEN);
        assert_eq!(VideoId::parse(id.as_str()), Ok(id));
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| VideoId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        for raw in ["xyz", "", "65f1c0ffee", "65f1c0ffee65f1c0ffee65fz", "65f1c0ffee65f1c0ffee65f1a"] {
            assert!(VideoId::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn parse_normalizes_case() {
        let id = VideoId::parse("65F1C0FFEE65F1C0FFEE65F1").unwrap();
        assert_eq!(id.as_str(), "65f1c0ffee65f1c0ffee65f1");
    }
}
