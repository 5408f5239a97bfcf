//! Container formats accepted for upload.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A video container format, identified by its lowercased file extension.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    Mp4,
    Avi,
    Mov,
    Mkv,
    Webm,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 5] = [
        VideoFormat::Mp4,
        VideoFormat::Avi,
        VideoFormat::Mov,
        VideoFormat::Mkv,
        VideoFormat::Webm,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Avi => "avi",
            VideoFormat::Mov => "mov",
            VideoFormat::Mkv => "mkv",
            VideoFormat::Webm => "webm",
        }
    }

    /// MIME type used when the client did not send one with the file part.
    pub fn content_type(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "video/mp4",
            VideoFormat::Avi => "video/x-msvideo",
            VideoFormat::Mov => "video/quicktime",
            VideoFormat::Mkv => "video/x-matroska",
            VideoFormat::Webm => "video/webm",
        }
    }

    /// Derive the format from the text after the last `.` of a filename.
    ///
    /// Returns `None` when there is no extension or it is not in the allowed set.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }

    /// Comma-separated list of accepted extensions, for error messages.
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for VideoFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or(())
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
