//! Content and image normalization.
//!
//! `delta.content` arrives as a plain string, an array of typed blocks, or a single
//! nested object depending on the model family. [`ContentShape`] names those
//! shapes explicitly; anything unrecognised goes through a fallback that tries text
//! and then image extraction. Recursion is bounded by [`MAX_CONTENT_DEPTH`].

use super::StreamEvent;
use crate::utils::FieldLookup;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use serde_json::{Map, Value};

pub const MAX_CONTENT_DEPTH: usize = 4;

const DEFAULT_IMAGE_MIME: &str = "image/png";
const BASE64_KEYS: &[&str] = &["b64_json", "base64", "image_base64", "data"];
const MIME_KEYS: &[&str] = &["mime_type", "mimeType", "media_type", "content_type"];
const INLINE_WRAPPERS: &[&str] = &["inline_data", "inlineData", "data"];
const TEXT_BLOCK_TYPES: &[&str] = &["text", "output_text"];
const IMAGE_BLOCK_TYPES: &[&str] = &["image_url", "image", "input_image", "output_image"];
const REASONING_BLOCK_TYPES: &[&str] = &["reasoning", "thinking"];

/// The shapes a content value can take.
#[derive(Debug, Clone, Copy)]
pub enum ContentShape<'a> {
    Text(&'a str),
    Blocks(&'a [Value]),
    Object(&'a Map<String, Value>),
    /// Numbers, booleans, null.
    Other(&'a Value),
}

impl<'a> ContentShape<'a> {
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::String(s) => ContentShape::Text(s),
            Value::Array(items) => ContentShape::Blocks(items),
            Value::Object(map) => ContentShape::Object(map),
            other => ContentShape::Other(other),
        }
    }
}

/// Append the events a content value carries.
pub fn normalize_content(value: &Value, events: &mut Vec<StreamEvent>) {
    normalize_at(value, 0, events);
}

fn normalize_at(value: &Value, depth: usize, events: &mut Vec<StreamEvent>) {
    if depth > MAX_CONTENT_DEPTH {
        tracing::debug!(depth, "content nesting too deep, dropped");
        return;
    }
    match ContentShape::of(value) {
        ContentShape::Text(s) => {
            if !s.is_empty() {
                events.push(StreamEvent::text(s));
            }
        }
        ContentShape::Blocks(items) => {
            for item in items {
                normalize_at(item, depth + 1, events);
            }
        }
        ContentShape::Object(map) => normalize_block(value, map, depth, events),
        ContentShape::Other(_) => {}
    }
}

fn normalize_block(
    value: &Value,
    map: &Map<String, Value>,
    depth: usize,
    events: &mut Vec<StreamEvent>,
) {
    let block_type = map.get("type").and_then(Value::as_str).unwrap_or_default();

    if TEXT_BLOCK_TYPES.contains(&block_type) {
        if let Some(text) = map.get("text").and_then(Value::as_str) {
            if !text.is_empty() {
                events.push(StreamEvent::text(text));
            }
        }
        return;
    }

    if IMAGE_BLOCK_TYPES.contains(&block_type) {
        match normalize_image_at(value, depth) {
            Some(url) => events.push(StreamEvent::image(url)),
            None => tracing::debug!(block_type, "image block without usable source"),
        }
        return;
    }

    if REASONING_BLOCK_TYPES.contains(&block_type) {
        if let Some(text) = FieldLookup::first_str(value, &["text", "thinking"]) {
            if !text.is_empty() {
                events.push(StreamEvent::reasoning(text));
            }
        }
        return;
    }

    // Untyped or unknown block: text, then image, then a nested `content`.
    if let Some(text) = map.get("text").and_then(Value::as_str) {
        if !text.is_empty() {
            events.push(StreamEvent::text(text));
        }
    } else if let Some(url) = normalize_image_at(value, depth) {
        events.push(StreamEvent::image(url));
    } else if let Some(inner) = map.get("content") {
        normalize_at(inner, depth + 1, events);
    }
}

/// Canonical image reference (URL or data URI) for any known image shape.
pub fn normalize_image(value: &Value) -> Option<String> {
    normalize_image_at(value, 0)
}

fn normalize_image_at(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_CONTENT_DEPTH {
        return None;
    }
    match value {
        Value::String(s) => image_reference(s),
        Value::Object(map) => {
            for key in ["image_url", "url", "image"] {
                if let Some(inner) = map.get(key) {
                    if let Some(url) = normalize_image_at(inner, depth + 1) {
                        return Some(url);
                    }
                }
            }
            for key in INLINE_WRAPPERS {
                if let Some(inner @ Value::Object(_)) = map.get(*key) {
                    if let Some(url) = normalize_image_at(inner, depth + 1) {
                        return Some(url);
                    }
                }
            }
            let data = FieldLookup::first_str(value, BASE64_KEYS)?;
            if let Some(url) = image_reference(data) {
                return Some(url);
            }
            let mime = FieldLookup::first_str(value, MIME_KEYS)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| sniff_mime(data).to_string());
            data_uri(&mime, data)
        }
        _ => None,
    }
}

fn image_reference(s: &str) -> Option<String> {
    let s = s.trim();
    if s.starts_with("data:") || s.starts_with("https://") || s.starts_with("http://") {
        Some(s.to_string())
    } else {
        None
    }
}

fn data_uri(mime: &str, data: &str) -> Option<String> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    Some(format!("data:{};base64,{}", mime, data))
}

/// Guess an image mime type from the leading decoded bytes.
pub fn sniff_mime(data: &str) -> &'static str {
    let data = data.trim();
    let len = data.len().min(16) / 4 * 4;
    let Some(prefix) = data.get(..len) else {
        return DEFAULT_IMAGE_MIME;
    };
    let bytes = match STANDARD.decode(prefix).or_else(|_| URL_SAFE.decode(prefix)) {
        Ok(b) => b,
        Err(_) => return DEFAULT_IMAGE_MIME,
    };

    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_IMAGE_MIME
    }
}
