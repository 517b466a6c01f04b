//! 用量归一化模块：将上游异构的用量对象归一为统一的 UsageMetrics，并组装可持久化的日志记录。
//!
//! # Usage Normalization
//!
//! Upstream families report token usage under different historical key names.
//! [`normalize_usage`] resolves every metric from an explicit ordered candidate
//! list (first present wins) and never derives one metric from others: a missing
//! `total_tokens` stays missing rather than becoming `prompt + completion`.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`UsageMetrics`] | Canonical usage record |
//! | [`normalize_usage`] | Heterogeneous usage object → [`UsageMetrics`] |
//! | [`build_usage_log_payload`] | Timing, status and meta bag → [`UsageLogPayload`] |
//! | [`UsageSink`] | Persistence seam (`save`) |

pub mod log;
pub mod sink;

pub use log::{
    build_usage_log_payload, ReconciliationOutcome, UsageLogMeta, UsageLogOptions,
    UsageLogPayload, UsageStatus,
};
pub use sink::{noop_usage_sink, InMemoryUsageSink, NoopUsageSink, UsageSink};

use crate::utils::FieldLookup;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const PROMPT_TOKENS: &[&str] = &["prompt_tokens", "input_tokens"];
const COMPLETION_TOKENS: &[&str] = &["completion_tokens", "output_tokens"];
const TOTAL_TOKENS: &[&str] = &["total_tokens"];
const CACHED_TOKENS: &[&str] = &[
    "cached_tokens",
    "prompt_tokens_details.cached_tokens",
    "input_tokens_details.cached_tokens",
    "cache_read_input_tokens",
];
const REASONING_TOKENS: &[&str] = &[
    "reasoning_tokens",
    "completion_tokens_details.reasoning_tokens",
    "output_tokens_details.reasoning_tokens",
];
const COST: &[&str] = &["cost", "total_cost"];
const COST_DETAILS: &str = "cost_details";

/// Canonical usage record for one completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Named numeric sub-costs. Non-numeric upstream entries are dropped.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cost_details: BTreeMap<String, f64>,
    /// The usage object exactly as received.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl UsageMetrics {
    /// Prompt/completion/total tokens or cost.
    pub fn has_primary(&self) -> bool {
        self.prompt_tokens.is_some()
            || self.completion_tokens.is_some()
            || self.total_tokens.is_some()
            || self.cost.is_some()
    }

    /// Cached/reasoning tokens or cost details.
    pub fn has_secondary(&self) -> bool {
        self.cached_tokens.is_some()
            || self.reasoning_tokens.is_some()
            || !self.cost_details.is_empty()
    }
}

/// Normalize a usage-shaped object.
///
/// Returns `None` for non-objects and for objects that carry no recognised
/// metric; an empty-looking usage object is not coerced into zeros.
pub fn normalize_usage(raw: &Value) -> Option<UsageMetrics> {
    if !raw.is_object() {
        return None;
    }

    let metrics = UsageMetrics {
        prompt_tokens: FieldLookup::first_count(raw, PROMPT_TOKENS),
        completion_tokens: FieldLookup::first_count(raw, COMPLETION_TOKENS),
        total_tokens: FieldLookup::first_count(raw, TOTAL_TOKENS),
        cached_tokens: FieldLookup::first_count(raw, CACHED_TOKENS),
        reasoning_tokens: FieldLookup::first_count(raw, REASONING_TOKENS),
        cost: FieldLookup::first_number(raw, COST),
        cost_details: cost_details(raw),
        raw: raw.clone(),
    };

    if metrics.has_primary() || metrics.has_secondary() {
        Some(metrics)
    } else {
        tracing::trace!("usage object carries no recognised metric");
        None
    }
}

fn cost_details(raw: &Value) -> BTreeMap<String, f64> {
    let Some(Value::Object(details)) = FieldLookup::get_path(raw, COST_DETAILS) else {
        return BTreeMap::new();
    };
    details
        .iter()
        .filter_map(|(k, v)| {
            v.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| (k.clone(), f))
        })
        .collect()
}
