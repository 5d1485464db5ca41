//! Content-type classification for transaction display
//!
//! Maps a transaction's declared media type to a display category and color.
//! Lookup falls through exact type, then primary subtype (the part before the
//! `/`), then a generic default.

use std::collections::HashMap;

/// Display style for a content category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStyle {
    pub category: &'static str,
    pub color: u32,
}

const STYLES: &[ContentStyle] = &[
    ContentStyle { category: "text/plain", color: 0x00ff00 },
    ContentStyle { category: "text/html", color: 0x32cd32 },
    ContentStyle { category: "text/javascript", color: 0x90ee90 },
    ContentStyle { category: "text", color: 0x00ff00 },
    ContentStyle { category: "image/jpeg", color: 0xff1493 },
    ContentStyle { category: "image/png", color: 0xff69b4 },
    ContentStyle { category: "image", color: 0xff00ff },
    ContentStyle { category: "video", color: 0x00ffff },
    ContentStyle { category: "audio", color: 0xffa500 },
    ContentStyle { category: "application/pdf", color: 0xff0000 },
    ContentStyle { category: "application/json", color: 0x0000ff },
    ContentStyle { category: "application/zip", color: 0x8b4513 },
    ContentStyle { category: "application/x-tar", color: 0x8b4513 },
    ContentStyle { category: "application/gzip", color: 0x8b4513 },
    ContentStyle { category: "application/x-rar-compressed", color: 0x8b4513 },
    ContentStyle { category: "application/x-arweave-manifest+json", color: 0x00ff88 },
    ContentStyle { category: "application", color: 0x1e90ff },
    ContentStyle { category: "other", color: 0x808080 },
];

/// Fallback category when nothing matches
pub const DEFAULT_CATEGORY: &str = "other";

fn lookup(category: &str) -> Option<&'static ContentStyle> {
    STYLES.iter().find(|style| style.category == category)
}

/// Classify a transaction's tag map by its declared `Content-Type`
///
/// A missing `Content-Type` tag classifies as the generic default.
pub fn classify(tags: &HashMap<String, String>) -> &'static ContentStyle {
    let content_type = tags
        .get("Content-Type")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CATEGORY);

    let main_type = content_type.split('/').next().unwrap_or(DEFAULT_CATEGORY);

    lookup(content_type)
        .or_else(|| lookup(main_type))
        .unwrap_or_else(|| lookup(DEFAULT_CATEGORY).expect("default style present"))
}

/// Whether a tag map declares visual (image) content
pub fn is_visual(tags: &HashMap<String, String>) -> bool {
    tags.get("Content-Type")
        .map(|value| value.starts_with("image/"))
        .unwrap_or(false)
}
