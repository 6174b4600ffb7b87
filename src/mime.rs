//! MIME classification of side content.
//!
//! The engine only needs two answers from a registry: what type a file is,
//! and whether an image of that type may be shown inline. The bundled
//! [`ExtensionMimeRegistry`] answers from the file name, falling back to a
//! binary sniff of the first few kilobytes.

use serde::Serialize;
use std::path::Path;

/// A MIME type such as `text/x-rust` or `image/png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MimeType(String);

impl MimeType {
    pub fn new(essence: impl Into<String>) -> Self {
        Self(essence.into())
    }

    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text/plain")
    }

    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application/octet-stream")
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the slash.
    #[inline]
    #[must_use]
    pub fn media_type(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(media, _)| media)
    }

    #[inline]
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type() == "image"
    }
}

impl Default for MimeType {
    fn default() -> Self {
        Self::octet_stream()
    }
}

/// Classifies content for display.
pub trait MimeRegistry: Send + Sync {
    fn mime_type(&self, path: Option<&str>, content: &[u8]) -> MimeType;

    /// Whether `mime` can be rendered inline without risk (no scripts).
    fn is_safe_inline(&self, mime: &MimeType) -> bool;
}

/// Bytes inspected when deciding whether unknown content is binary.
const SNIFF_LEN: usize = 8000;

const BY_EXTENSION: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("svg", "image/svg+xml"),
    ("rs", "text/x-rust"),
    ("lua", "text/x-lua"),
    ("c", "text/x-csrc"),
    ("h", "text/x-chdr"),
    ("java", "text/x-java"),
    ("py", "text/x-python"),
    ("js", "text/javascript"),
    ("ts", "text/typescript"),
    ("go", "text/x-go"),
    ("md", "text/markdown"),
    ("toml", "text/x-toml"),
    ("json", "application/json"),
    ("html", "text/html"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
];

/// Images that cannot carry active content.
const SAFE_INLINE: &[&str] = &[
    "image/png",
    "image/gif",
    "image/jpeg",
    "image/bmp",
    "image/webp",
    "image/x-icon",
];

/// Extension-table registry with a NUL-byte binary check for unknown names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeRegistry;

impl MimeRegistry for ExtensionMimeRegistry {
    fn mime_type(&self, path: Option<&str>, content: &[u8]) -> MimeType {
        let by_name = path
            .and_then(|p| Path::new(p).extension())
            .and_then(|ext| ext.to_str())
            .and_then(|ext| {
                BY_EXTENSION
                    .iter()
                    .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            })
            .map(|(_, mime)| MimeType::new(*mime));

        by_name.unwrap_or_else(|| {
            let head = &content[..content.len().min(SNIFF_LEN)];
            if head.contains(&0) {
                MimeType::octet_stream()
            } else {
                MimeType::text_plain()
            }
        })
    }

    fn is_safe_inline(&self, mime: &MimeType) -> bool {
        SAFE_INLINE.contains(&mime.as_str())
    }
}
