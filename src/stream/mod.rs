//! 流式解码层：把上游 SSE 数据行解码为统一的类型化事件序列。
//!
//! # Stream Decoding
//!
//! The upstream API streams one JSON chunk per `data:` line. Chunks from different
//! model families disagree on where text, reasoning, images and usage live; this
//! module turns each line into an ordered list of [`StreamEvent`]s.
//!
//! Decoding is per line and stateless: every event a line contains is produced
//! by the call that receives it, and nothing is buffered for a later call.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`decode_line`] | One framed line → [`DecodeResult`] |
//! | [`decode_lines`] | Async line stream → stream of [`DecodeResult`], ends at `[DONE]` |
//! | [`content`] | Content-shape and image normalization |
//!
//! Per chunk, facts are extracted in a fixed order: error (exclusive), usage,
//! then per choice reasoning details, reasoning text, images, content, message
//! content fallback and attachments.

pub mod content;
pub mod decoder;
pub mod lines;

pub use decoder::decode_line;
pub use lines::decode_lines;

use crate::usage::UsageMetrics;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal stream-termination payload.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One typed fact extracted from a stream chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Text {
        text: String,
    },
    ReasoningStreamText {
        text: String,
    },
    /// Structured reasoning fragment, forwarded verbatim in `raw`.
    ReasoningDetail {
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        raw: Value,
    },
    /// Canonical image reference: an `http(s)` URL or a `data:` URI.
    Image {
        url: String,
    },
    Usage {
        /// `None` when the usage object carries no recognised metric.
        usage: Option<UsageMetrics>,
        raw: Value,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        raw: Value,
    },
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        StreamEvent::Text { text: text.into() }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        StreamEvent::ReasoningStreamText { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        StreamEvent::Image { url: url.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StreamEvent::Error { .. })
    }

    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Text { .. } => "text",
            StreamEvent::ReasoningStreamText { .. } => "reasoning_stream_text",
            StreamEvent::ReasoningDetail { .. } => "reasoning_detail",
            StreamEvent::Image { .. } => "image",
            StreamEvent::Usage { .. } => "usage",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// A line whose `data:` payload could not be used. Returned as a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError {
    #[error("invalid JSON payload: {message}")]
    InvalidJson { message: String, payload: String },

    #[error("payload is not a JSON object")]
    NotAnObject { payload: String },
}

/// Result of decoding one line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeResult {
    pub events: Vec<StreamEvent>,
    pub is_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<DecodeError>,
}

impl DecodeResult {
    pub(crate) fn events(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    pub(crate) fn done() -> Self {
        Self {
            is_done: true,
            ..Default::default()
        }
    }

    pub(crate) fn failed(error: DecodeError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// Nothing to report: blank, comment or non-data line.
    pub fn is_noop(&self) -> bool {
        self.events.is_empty() && !self.is_done && self.error.is_none()
    }
}
