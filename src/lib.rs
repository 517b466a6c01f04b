//! # gen-protocol-adapter
//!
//! 这是多模型补全 API 的生成协议适配层：按模型能力表编码请求参数，并容错地解码流式响应。
//!
//! Generation protocol adapter for a multi-model completion API. It sits between a
//! chat application and the upstream API and does two jobs:
//!
//! - **Request encoding**: turns an abstract [`GenerationConfig`] (sampling, length,
//!   reasoning) into the request fragment a specific model accepts, gated by that
//!   model's [`ModelGenerationCapability`].
//! - **Stream decoding**: turns the upstream's heterogeneous `data:` lines into a
//!   uniform sequence of [`StreamEvent`]s, and usage objects into [`UsageMetrics`].
//!
//! ## Core Philosophy
//!
//! - **Fail closed**: a model without a capability record gets no optional parameter
//! - **Never fatal**: unsupported or out-of-range values become warnings, not errors
//! - **Stateless**: every adapter is a pure function; the catalog is a swappable snapshot
//! - **Deterministic**: identical inputs produce structurally identical outputs
//!
//! ## Quick Start
//!
//! ```rust
//! use gen_protocol_adapter::{
//!     decode_line, encode_request, CapabilityCatalog, CapabilitySource, GenerationConfig,
//! };
//!
//! # fn main() -> gen_protocol_adapter::Result<()> {
//! let catalog = CapabilityCatalog::from_yaml_str(r#"
//! capabilities:
//!   - id: vendor/chat-model
//!     sampling: { temperature: true }
//!     length: { max_tokens: true, max_completion_tokens: 8192 }
//! "#)?;
//! let config = GenerationConfig::from_yaml_str("sampling: { temperature: 2.5 }")?;
//!
//! let cap = catalog.get_capability("vendor/chat-model");
//! let out = encode_request("vendor/chat-model", cap.as_deref(), &config);
//! assert_eq!(out.request_fragment.temperature, Some(2.0));
//! assert_eq!(out.warnings.len(), 1);
//!
//! let decoded = decode_line(r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#);
//! assert_eq!(decoded.events.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capability`] | Capability records, classification and the catalog snapshot |
//! | [`config`] | Generation config, defaults merging, `auto` resolution, policy |
//! | [`request`] | Sampling / reasoning / length sub-adapters and the encoder |
//! | [`stream`] | Line decoder and content/image normalization |
//! | [`usage`] | Usage normalization, log records and the sink seam |

pub mod capability;
pub mod config;
pub mod request;
pub mod stream;
pub mod usage;
pub mod utils;

// Re-export main types for convenience
pub use capability::{
    classify, CapabilityCatalog, CapabilitySource, ModelGenerationCapability, ReasoningClass,
    UpstreamModel, VisibleReasoning,
};
pub use config::{resolve_config, AdapterPolicy, GenerationConfig};
pub use request::{
    encode_request, EncodeResult, IgnoredParameter, RequestEncoder, RequestFragment, Warning,
    WarningKind,
};
pub use stream::{decode_line, decode_lines, DecodeError, DecodeResult, StreamEvent};
pub use usage::{
    build_usage_log_payload, normalize_usage, UsageLogOptions, UsageLogPayload, UsageMetrics,
    UsageSink,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
