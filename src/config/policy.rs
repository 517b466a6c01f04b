//! Tunable encoder policy.

use serde::{Deserialize, Serialize};

/// Policy knobs that are not fixed by the upstream protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterPolicy {
    /// More than this many distribution-shaping sampling keys set at once triggers
    /// an interference advisory.
    pub max_concurrent_samplers: usize,
    /// Answer room reserved above a class-A reasoning budget when the model's
    /// `max_tokens` counts reasoning tokens.
    pub answer_headroom: u32,
}

impl Default for AdapterPolicy {
    fn default() -> Self {
        Self {
            max_concurrent_samplers: 2,
            answer_headroom: 4096,
        }
    }
}

impl AdapterPolicy {
    pub fn with_max_concurrent_samplers(mut self, n: usize) -> Self {
        self.max_concurrent_samplers = n;
        self
    }

    pub fn with_answer_headroom(mut self, tokens: u32) -> Self {
        self.answer_headroom = tokens;
        self
    }
}
