//! Persistable usage log record.

use super::{normalize_usage, UsageMetrics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageStatus {
    #[default]
    Success,
    Error,
    Aborted,
}

/// Outcome of comparing streamed usage against a later authoritative lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    #[default]
    NotAttempted,
    Matched,
    Adjusted,
    Missing,
}

/// Inputs for [`build_usage_log_payload`].
///
/// Durations are signed so that clock skew between the measuring points can be
/// passed through unchanged; they are clamped when the record is built.
#[derive(Debug, Clone, Default)]
pub struct UsageLogOptions {
    pub request_id: Option<String>,
    pub model_id: String,
    /// Final usage object as received from the stream, if any.
    pub raw_usage: Option<Value>,
    pub duration_ms: i64,
    pub time_to_first_token_ms: Option<i64>,
    pub attempts: u32,
    pub status: UsageStatus,
    pub error_code: Option<String>,
    pub aborted: bool,
    pub reconciliation: ReconciliationOutcome,
    pub extra: BTreeMap<String, Value>,
    /// Record timestamp (unix ms); the build time when unset.
    pub created_at_ms: Option<u64>,
}

impl UsageLogOptions {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_raw_usage(mut self, usage: Value) -> Self {
        self.raw_usage = Some(usage);
        self
    }

    pub fn with_timing(mut self, duration_ms: i64, time_to_first_token_ms: Option<i64>) -> Self {
        self.duration_ms = duration_ms;
        self.time_to_first_token_ms = time_to_first_token_ms;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_error(mut self, code: impl Into<String>) -> Self {
        self.status = UsageStatus::Error;
        self.error_code = Some(code.into());
        self
    }

    pub fn aborted(mut self) -> Self {
        self.aborted = true;
        self
    }

    pub fn with_reconciliation(mut self, outcome: ReconciliationOutcome) -> Self {
        self.reconciliation = outcome;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn with_created_at_ms(mut self, unix_ms: u64) -> Self {
        self.created_at_ms = Some(unix_ms);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLogMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_usage: Option<Value>,
    pub reconciliation: ReconciliationOutcome,
    pub aborted: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogPayload {
    pub request_id: String,
    pub model_id: String,
    pub status: UsageStatus,
    /// `None` records a known-missing measurement.
    pub usage: Option<UsageMetrics>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_first_token_ms: Option<u64>,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub created_at_ms: u64,
    pub meta: UsageLogMeta,
}

/// Compose a usage log record. An abort flag overrides a `success` status.
pub fn build_usage_log_payload(options: UsageLogOptions) -> UsageLogPayload {
    let usage = options.raw_usage.as_ref().and_then(normalize_usage);
    if usage.is_none() {
        tracing::debug!(model = options.model_id.as_str(), "usage missing for completed request");
    }

    let status = match (options.status, options.aborted) {
        (UsageStatus::Success, true) => UsageStatus::Aborted,
        (status, _) => status,
    };

    let request_id = options
        .request_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    UsageLogPayload {
        request_id,
        model_id: options.model_id,
        status,
        usage,
        duration_ms: non_negative(options.duration_ms),
        time_to_first_token_ms: options.time_to_first_token_ms.map(non_negative),
        attempts: options.attempts.max(1),
        error_code: options.error_code,
        created_at_ms: options.created_at_ms.unwrap_or_else(now_ms),
        meta: UsageLogMeta {
            raw_usage: options.raw_usage,
            reconciliation: options.reconciliation,
            aborted: options.aborted,
            extra: options.extra,
        },
    }
}

fn non_negative(ms: i64) -> u64 {
    u64::try_from(ms).unwrap_or(0)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
