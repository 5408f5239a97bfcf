//! Storage-key derivation for uploaded files.

use uuid::Uuid;

/// Upper bound on the sanitized filename embedded in a storage key.
pub const MAX_FILENAME_LEN: usize = 120;

const KEY_PREFIX: &str = "videos";
const FALLBACK_STEM: &str = "video";

/// Reduce a client-supplied filename to a safe, bounded ASCII name.
///
/// Only the last path component survives, whitespace runs become `_`,
/// anything outside `[A-Za-z0-9._-]` is dropped and runs of `.` collapse to
/// one. When truncating, the extension is preserved.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let joined = last.split_whitespace().collect::<Vec<_>>().join("_");
    let mut cleaned = String::with_capacity(joined.len());
    for c in joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        if c == '.' && cleaned.ends_with('.') {
            continue;
        }
        cleaned.push(c);
    }

    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, Some(ext)),
        _ => (cleaned.as_str(), None),
    };
    let stem = stem.trim_matches(|c| c == '.' || c == '_');
    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    match ext {
        Some(ext) => {
            let ext = truncate(ext, MAX_FILENAME_LEN / 2);
            let budget = MAX_FILENAME_LEN - ext.len() - 1;
            format!("{}.{}", truncate(stem, budget), ext)
        }
        None => truncate(stem, MAX_FILENAME_LEN).to_string(),
    }
}

/// `videos/{uuid}_{sanitized filename}`; never reused across uploads.
pub fn storage_key(filename: &str) -> String {
    format!("{}/{}_{}", KEY_PREFIX, Uuid::new_v4(), sanitize_filename(filename))
}

/// Input is ASCII after sanitizing, so byte slicing is safe.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() > max { &s[..max] } else { s }
}
