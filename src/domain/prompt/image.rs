//! Detection of image payloads embedded in user inputs

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
    Engine as _,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::ai::PromptImage;

/// Minimum length of a bare base64 run treated as an image
const MIN_BASE64_IMAGE_LEN: usize = 100;

/// `data:image/<subtype>;base64,<payload>`
static DATA_URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:(image/[a-zA-Z0-9.+-]+);base64,(.+)$").unwrap()
});

static BASE64_RUN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").unwrap());

/// Extracts an image from an input value, if it holds one
pub fn detect_image(name: &str, raw: &str) -> Option<PromptImage> {
    let value = raw.trim();

    if let Some(caps) = DATA_URI_PATTERN.captures(value) {
        return Some(PromptImage {
            name: name.to_string(),
            media_type: caps[1].to_string(),
            data: caps[2].to_string(),
        });
    }

    let compact: String = value.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
    if compact.len() < MIN_BASE64_IMAGE_LEN || !BASE64_RUN_PATTERN.is_match(&compact) {
        return None;
    }

    let bytes = STANDARD
        .decode(&compact)
        .or_else(|_| STANDARD_NO_PAD.decode(&compact))
        .ok()?;

    Some(PromptImage {
        name: name.to_string(),
        media_type: sniff_media_type(&bytes).to_string(),
        data: compact,
    })
}

/// Guesses an image media type from its magic bytes
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

/// Placeholder substituted where an image was lifted out of the text
pub fn image_placeholder(name: &str) -> String {
    format!("[Image: {}]", name)
}
