//! Single-line SSE decoder.

use super::content::{normalize_content, normalize_image};
use super::{DecodeError, DecodeResult, StreamEvent, DONE_SENTINEL};
use crate::usage::normalize_usage;
use crate::utils::FieldLookup;
use serde_json::Value;

const DATA_PREFIX: &str = "data:";
const REASONING_TEXT: &[&str] = &["reasoning", "reasoning_content"];
const ERROR_MESSAGE: &[&str] = &["message", "error.message", "detail"];
const ERROR_CODE: &[&str] = &["code", "type", "error.code"];
const PAYLOAD_PREVIEW_CHARS: usize = 256;

/// Decode one already-framed line. Never panics; malformed payloads come back as
/// [`DecodeResult::error`].
pub fn decode_line(line: &str) -> DecodeResult {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return DecodeResult::default();
    }
    let Some(payload) = trimmed.strip_prefix(DATA_PREFIX) else {
        tracing::trace!(line = trimmed, "skipping non-data line");
        return DecodeResult::default();
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return DecodeResult::done();
    }

    let chunk: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "undecodable stream payload");
            return DecodeResult::failed(DecodeError::InvalidJson {
                message: e.to_string(),
                payload: preview(payload),
            });
        }
    };
    if !chunk.is_object() {
        tracing::warn!("stream payload is not a JSON object");
        return DecodeResult::failed(DecodeError::NotAnObject {
            payload: preview(payload),
        });
    }

    DecodeResult::events(decompose(&chunk))
}

/// Extract every fact from one parsed chunk in the fixed precedence order.
pub fn decompose(chunk: &Value) -> Vec<StreamEvent> {
    if let Some(error) = find_error(chunk) {
        return vec![error];
    }

    let mut events = Vec::new();
    let choices = chunk
        .get("choices")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let usage = FieldLookup::get_path(chunk, "usage")
        .or_else(|| choices.iter().find_map(|c| FieldLookup::get_path(c, "usage")));
    if let Some(raw) = usage {
        events.push(StreamEvent::Usage {
            usage: normalize_usage(raw),
            raw: raw.clone(),
        });
    }

    for choice in choices {
        decompose_choice(choice, &mut events);
    }
    events
}

fn decompose_choice(choice: &Value, events: &mut Vec<StreamEvent>) {
    let delta = choice.get("delta").unwrap_or(&Value::Null);

    if let Some(details) = delta.get("reasoning_details").and_then(Value::as_array) {
        for (position, detail) in details.iter().enumerate() {
            events.push(reasoning_detail(position, detail));
        }
    }

    if let Some(text) = REASONING_TEXT
        .iter()
        .filter_map(|key| delta.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
    {
        events.push(StreamEvent::reasoning(text));
    }

    if let Some(images) = delta.get("images").and_then(Value::as_array) {
        push_images(images, events);
    }
    if let Some(image) = FieldLookup::get_path(delta, "image") {
        push_images(std::slice::from_ref(image), events);
    }

    // `message.content` only fills in when the delta carried nothing renderable.
    let before = events.len();
    if let Some(content) = FieldLookup::get_path(delta, "content") {
        normalize_content(content, events);
    }
    if events.len() == before {
        if let Some(content) = FieldLookup::get_path(choice, "message.content") {
            normalize_content(content, events);
        }
    }

    for scope in [choice, delta] {
        if let Some(attachments) = scope.get("attachments").and_then(Value::as_array) {
            push_images(attachments, events);
        }
    }
}

fn push_images(items: &[Value], events: &mut Vec<StreamEvent>) {
    for item in items {
        match normalize_image(item) {
            Some(url) => events.push(StreamEvent::image(url)),
            None => tracing::debug!("image entry without usable source"),
        }
    }
}

fn reasoning_detail(position: usize, detail: &Value) -> StreamEvent {
    let owned = |key: &str| detail.get(key).and_then(Value::as_str).map(str::to_string);
    StreamEvent::ReasoningDetail {
        index: detail
            .get("index")
            .and_then(Value::as_u64)
            .or(Some(position as u64)),
        detail_type: owned("type"),
        format: owned("format"),
        id: owned("id"),
        text: FieldLookup::first_str(detail, &["text", "summary"]).map(str::to_string),
        raw: detail.clone(),
    }
}

/// Upstream error at top level, per choice, per delta, or signalled by
/// `finish_reason == "error"`.
fn find_error(chunk: &Value) -> Option<StreamEvent> {
    let top = FieldLookup::get_path(chunk, "error").filter(|v| is_error_value(v));
    if let Some(err) = top {
        return Some(error_event(err));
    }
    let choices = chunk.get("choices").and_then(Value::as_array)?;
    for choice in choices {
        let nested = ["error", "delta.error"]
            .iter()
            .filter_map(|path| FieldLookup::get_path(choice, path))
            .find(|v| is_error_value(v));
        if let Some(err) = nested {
            return Some(error_event(err));
        }
        if choice.get("finish_reason").and_then(Value::as_str) == Some("error") {
            tracing::warn!("upstream finished stream with error");
            return Some(StreamEvent::Error {
                message: "upstream finished with error".to_string(),
                code: None,
                raw: choice.clone(),
            });
        }
    }
    None
}

/// Only a non-empty string or an object reports an error; `false`, `0` and the
/// like are placeholders.
fn is_error_value(v: &Value) -> bool {
    match v {
        Value::String(s) => !s.trim().is_empty(),
        Value::Object(_) => true,
        _ => false,
    }
}

fn error_event(err: &Value) -> StreamEvent {
    let (message, code) = match err {
        Value::String(s) => (s.clone(), None),
        Value::Object(_) => (
            FieldLookup::first_str(err, ERROR_MESSAGE)
                .unwrap_or("upstream error")
                .to_string(),
            FieldLookup::first_present(err, ERROR_CODE).and_then(code_string),
        ),
        other => (other.to_string(), None),
    };
    tracing::warn!(code = code.as_deref().unwrap_or("-"), "upstream error: {}", message);
    StreamEvent::Error {
        message,
        code,
        raw: err.clone(),
    }
}

fn code_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn preview(payload: &str) -> String {
    payload.chars().take(PAYLOAD_PREVIEW_CHARS).collect()
}
