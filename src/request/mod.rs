//! 请求编码层：根据模型能力表把抽象生成配置编码为上游请求片段。
//!
//! # Request Encoding
//!
//! Translates an effective [`GenerationConfig`] into the flat request fragment the
//! upstream completion API expects, gated by the model's
//! [`ModelGenerationCapability`].
//!
//! Nothing in here fails a request: unsupported parameters become
//! [`IgnoredParameter`] entries, out-of-range values are clamped and reported as
//! [`Warning`]s, and the fragment only ever carries keys whose capability flag is
//! true.
//!
//! ## Sub-adapters
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`sampling`] | temperature, top_p, top_k, penalties, seed, logit_bias |
//! | [`reasoning`] | class-aware effort / budget / visibility encoding |
//! | [`length`] | max_tokens ceiling, stop, verbosity |
//!
//! Reasoning runs before length: a class-A budget decides the outgoing length
//! ceiling.

pub mod length;
pub mod reasoning;
pub mod sampling;

use crate::capability::ModelGenerationCapability;
use crate::config::{AdapterPolicy, Effort, GenerationConfig, StopSequences};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub(crate) const NOT_SUPPORTED: &str = "not supported";

/// `reasoning` object on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningFragment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<Effort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<bool>,
}

impl ReasoningFragment {
    pub fn is_empty(&self) -> bool {
        self.effort.is_none() && self.max_tokens.is_none() && self.exclude.is_none()
    }
}

/// Request body keys contributed by the adapter. Serialises flat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestFragment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningFragment>,
    /// Legacy compatibility flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_reasoning: Option<bool>,
}

impl RequestFragment {
    pub fn is_empty(&self) -> bool {
        self.to_map().is_empty()
    }

    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    /// Flat merge into an outer request body; fragment keys overwrite existing ones.
    pub fn merge_into(&self, body: &mut Map<String, Value>) {
        for (k, v) in self.to_map() {
            body.insert(k, v);
        }
    }

    /// Top-level wire keys present in this fragment.
    pub fn keys(&self) -> Vec<String> {
        self.to_map().keys().cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Clipped,
    Ignored,
    Fallback,
    Unsupported,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clipped => "clipped",
            Self::Ignored => "ignored",
            Self::Fallback => "fallback",
            Self::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Non-fatal encoding report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    /// Wire key (or `sampling` / `reasoning` for section-level notes).
    pub parameter: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl Warning {
    pub fn new(
        kind: WarningKind,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            parameter: parameter.into(),
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn clipped(
        parameter: &str,
        original: impl Into<Value>,
        clipped: impl Into<Value>,
        reason: Option<&str>,
    ) -> Self {
        let original = original.into();
        let clipped = clipped.into();
        let mut details = json!({ "original": original, "clipped": clipped });
        let mut message = format!("{} clipped from {} to {}", parameter, original, clipped);
        if let Some(reason) = reason {
            details["reason"] = json!(reason);
            message.push_str(&format!(" ({})", reason));
        }
        Self::new(WarningKind::Clipped, parameter, message).with_details(details)
    }

    pub fn ignored(parameter: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::Ignored, parameter, message)
    }

    pub fn fallback(parameter: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::Fallback, parameter, message)
    }

    pub fn unsupported(parameter: &str, message: impl Into<String>) -> Self {
        Self::new(WarningKind::Unsupported, parameter, message)
    }

    /// Whether this warning concerns the given wire key.
    pub fn mentions(&self, key: &str) -> bool {
        self.parameter == key
    }
}

/// A requested parameter the model does not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredParameter {
    pub key: String,
    pub reason: String,
}

/// Output of [`encode_request`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodeResult {
    pub request_fragment: RequestFragment,
    pub warnings: Vec<Warning>,
    pub ignored_parameters: Vec<IgnoredParameter>,
}

impl EncodeResult {
    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored_parameters.iter().any(|p| p.key == key)
    }
}

/// Warning / ignored-parameter accumulator shared by the sub-adapters.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    pub(crate) warnings: Vec<Warning>,
    pub(crate) ignored: Vec<IgnoredParameter>,
}

impl Diagnostics {
    pub(crate) fn warn(&mut self, warning: Warning) {
        tracing::debug!(
            kind = %warning.kind,
            parameter = warning.parameter.as_str(),
            "{}",
            warning.message
        );
        self.warnings.push(warning);
    }

    pub(crate) fn ignore(&mut self, key: &str, reason: &str) {
        tracing::debug!(parameter = key, reason, "parameter ignored");
        self.ignored.push(IgnoredParameter {
            key: key.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Runs the sub-adapters under one [`AdapterPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RequestEncoder {
    policy: AdapterPolicy,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: AdapterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AdapterPolicy {
        &self.policy
    }

    /// Encode one request. A missing capability denies every optional parameter.
    pub fn encode(
        &self,
        model_id: &str,
        capability: Option<&ModelGenerationCapability>,
        config: &GenerationConfig,
    ) -> EncodeResult {
        let denied;
        let cap = match capability {
            Some(c) => c,
            None => {
                tracing::debug!(model = model_id, "no capability record, failing closed");
                denied = ModelGenerationCapability::deny_all(model_id);
                &denied
            }
        };

        let mut fragment = RequestFragment::default();
        let mut diag = Diagnostics::default();

        if let Some(s) = &config.sampling {
            sampling::apply(s, &cap.sampling, &self.policy, &mut fragment, &mut diag);
        }

        let reasoning_ceiling = match &config.reasoning {
            Some(r) => reasoning::apply(r, cap, &self.policy, &mut fragment, &mut diag),
            None => None,
        };

        length::apply(
            config.length.as_ref(),
            cap,
            reasoning_ceiling,
            &mut fragment,
            &mut diag,
        );

        tracing::trace!(
            model = model_id,
            keys = ?fragment.keys(),
            warnings = diag.warnings.len(),
            ignored = diag.ignored.len(),
            "request encoded"
        );

        EncodeResult {
            request_fragment: fragment,
            warnings: diag.warnings,
            ignored_parameters: diag.ignored,
        }
    }
}

/// Encode with the default policy.
pub fn encode_request(
    model_id: &str,
    capability: Option<&ModelGenerationCapability>,
    config: &GenerationConfig,
) -> EncodeResult {
    RequestEncoder::new().encode(model_id, capability, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LengthConfig, SamplingConfig};

    #[test]
    fn test_missing_capability_fails_closed() {
        let cfg = GenerationConfig {
            sampling: Some(SamplingConfig {
                temperature: Some(0.5),
                seed: Some(7),
                ..Default::default()
            }),
            length: Some(LengthConfig {
                max_tokens: Some(100),
                ..Default::default()
            }),
            reasoning: None,
        };
        let out = encode_request("vendor/unknown", None, &cfg);
        assert!(out.request_fragment.is_empty());
        let keys: Vec<_> = out.ignored_parameters.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["temperature", "seed", "max_tokens"]);
    }

    #[test]
    fn test_fragment_serialises_flat_with_nested_reasoning() {
        let fragment = RequestFragment {
            temperature: Some(0.3),
            max_tokens: Some(2048),
            reasoning: Some(ReasoningFragment {
                effort: Some(Effort::High),
                max_tokens: None,
                exclude: Some(false),
            }),
            include_reasoning: Some(true),
            ..Default::default()
        };
        assert_eq!(
            fragment.to_value(),
            json!({
                "temperature": 0.3,
                "max_tokens": 2048,
                "reasoning": {"effort": "high", "exclude": false},
                "include_reasoning": true
            })
        );
    }

    #[test]
    fn test_merge_into_overwrites_flatly() {
        let fragment = RequestFragment {
            max_tokens: Some(10),
            ..Default::default()
        };
        let mut body = Map::new();
        body.insert("model".into(), json!("x/y"));
        body.insert("max_tokens".into(), json!(99));
        fragment.merge_into(&mut body);
        assert_eq!(Value::Object(body), json!({"model": "x/y", "max_tokens": 10}));
    }

    #[test]
    fn test_clipped_warning_shape() {
        let w = Warning::clipped("temperature", 2.5, 2.0, None);
        assert_eq!(w.kind, WarningKind::Clipped);
        assert_eq!(w.details["original"], json!(2.5));
        assert_eq!(w.details["clipped"], json!(2.0));
        assert!(w.message.contains("temperature"));
        let wire = serde_json::to_value(&w).unwrap();
        assert_eq!(wire["type"], json!("clipped"));
    }
}
