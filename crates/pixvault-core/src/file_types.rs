//! Supported picture and video formats.
//!
//! Extension checks are the import fast path: an unsupported extension is
//! rejected before any probing or storage side effect.

/// Classification of a file by its extension or mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSupport {
    Picture,
    Video,
}

const PICTURE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "tif", "tiff"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "wmv", "avi"];

const PICTURE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/tiff"];
const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-ms-wmv",
    "video/x-msvideo",
];

/// Returns the lowercased extension of `filename` (without the dot), or
/// `None` when the name has no extension.
pub fn file_extension(filename: &str) -> Option<String> {
    let index = filename.rfind('.')?;
    let ext = &filename[index + 1..];
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classifies an extension (without the dot, any case).
pub fn support_for_extension(ext: &str) -> Option<FormatSupport> {
    let ext = ext.to_ascii_lowercase();
    if PICTURE_EXTENSIONS.contains(&ext.as_str()) {
        Some(FormatSupport::Picture)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(FormatSupport::Video)
    } else {
        None
    }
}

/// Classifies a mime type.
pub fn support_for_mime(mime_type: &str) -> Option<FormatSupport> {
    if PICTURE_MIME_TYPES.contains(&mime_type) {
        Some(FormatSupport::Picture)
    } else if VIDEO_MIME_TYPES.contains(&mime_type) {
        Some(FormatSupport::Video)
    } else {
        None
    }
}

/// Canonical mime type for a supported extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "tif" | "tiff" => Some("image/tiff"),
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "wmv" => Some("video/x-ms-wmv"),
        "avi" => Some("video/x-msvideo"),
        _ => None,
    }
}

/// True when both filenames carry the same extension, case-insensitively.
pub fn extensions_match(a: &str, b: &str) -> bool {
    file_extension(a) == file_extension(b)
}

/// True for videos that are not already MP4 and therefore need conversion.
pub fn needs_mp4_conversion(filename: &str) -> bool {
    match file_extension(filename) {
        Some(ext) => support_for_extension(&ext) == Some(FormatSupport::Video) && ext != "mp4",
        None => false,
    }
}
