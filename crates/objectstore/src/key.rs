//! Key normalization and path-traversal guard (spec §4.8).

use docvault_core::Error;

/// Normalizes separators to `/` and rejects any `..` segment or absolute
/// path, matching the "forbids path traversal" contract of spec §4.8.
pub fn normalize(key: &str) -> Result<String, Error> {
    let normalized = key.replace('\\', "/");
    let mut segments = Vec::new();
    for segment in normalized.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return Err(Error::Backend(format!("path traversal rejected in key: {key}")));
        }
        segments.push(segment);
    }
    if segments.is_empty() {
        return Err(Error::Backend("empty object key".into()));
    }
    Ok(segments.join("/"))
}
