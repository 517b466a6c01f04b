//! 模型能力层：描述每个模型接受哪些生成参数及其推理分类。
//!
//! # Capability Layer
//!
//! Per-model static description of which generation parameters the upstream API
//! accepts for a model, within what bounds, and how the model treats reasoning
//! requests.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ModelGenerationCapability`] | Full per-model capability record |
//! | [`SamplingSupport`] / [`LengthSupport`] | Parameter acceptance flags |
//! | [`ReasoningDescriptor`] | Reasoning flags, visibility and class |
//! | [`ReasoningClass`] | A (bounded budget), B (effort + soft hint), C (unsupported) |
//! | [`VisibleReasoning`] | yes / no / unknown, kept distinct through the pipeline |
//! | [`CapabilityCatalog`] | Lock-free snapshot keyed by model id |
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`classify`] | Derive a capability from an upstream catalog entry |
//! | [`catalog`] | Snapshot storage, loading and lookup |
//!
//! A model missing from the catalog is never guessed: [`ModelGenerationCapability::deny_all`]
//! rejects every optional parameter.

pub mod catalog;
pub mod classify;

pub use catalog::{CapabilityCatalog, CapabilitySource, CatalogDocument};
pub use classify::{classify, UpstreamModel};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reasoning-parameter behaviour of a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasoningClass {
    /// Explicit token budget, hard-clamped into `[1024, 32000]`.
    #[serde(rename = "A", alias = "a")]
    A,
    /// Effort-only; a token value is a soft hint bounded by the model ceiling.
    #[serde(rename = "B", alias = "b")]
    B,
    /// No reasoning parameter at all.
    #[default]
    #[serde(rename = "C", alias = "c")]
    C,
}

impl fmt::Display for ReasoningClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(s)
    }
}

/// Whether the model returns its reasoning text in the response.
///
/// `Unknown` stays distinct from `No` so diagnostics can say "not verified" rather
/// than "not supported". [`VisibleReasoning::is_confirmed`] is the only place the two
/// collapse into a binary decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibleReasoning {
    Yes,
    No,
    #[default]
    Unknown,
}

impl VisibleReasoning {
    /// Binary decision: only a declared `yes` counts.
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Yes)
    }

    /// Human-readable label for diagnostics.
    pub fn diagnostic_label(self) -> &'static str {
        match self {
            Self::Yes => "supported",
            Self::No => "not supported",
            Self::Unknown => "not verified",
        }
    }
}

/// How the outer `max_tokens` relates to an explicit reasoning budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxTokensPolicy {
    /// The outer ceiling only has to stay above the budget.
    #[default]
    Passthrough,
    /// The outer ceiling counts reasoning tokens, so room for the answer is reserved.
    ReserveAboveReasoning,
}

/// Sampling parameters known to the adapter, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SamplingKey {
    Temperature,
    TopP,
    TopK,
    MinP,
    TopA,
    FrequencyPenalty,
    PresencePenalty,
    RepetitionPenalty,
    Seed,
    LogitBias,
}

impl SamplingKey {
    pub const ALL: [SamplingKey; 10] = [
        Self::Temperature,
        Self::TopP,
        Self::TopK,
        Self::MinP,
        Self::TopA,
        Self::FrequencyPenalty,
        Self::PresencePenalty,
        Self::RepetitionPenalty,
        Self::Seed,
        Self::LogitBias,
    ];

    /// Wire key, fixed by the upstream protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::TopK => "top_k",
            Self::MinP => "min_p",
            Self::TopA => "top_a",
            Self::FrequencyPenalty => "frequency_penalty",
            Self::PresencePenalty => "presence_penalty",
            Self::RepetitionPenalty => "repetition_penalty",
            Self::Seed => "seed",
            Self::LogitBias => "logit_bias",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Keys that shape the token distribution and can interfere with each other.
    pub fn is_distribution_shaping(self) -> bool {
        matches!(
            self,
            Self::Temperature | Self::TopP | Self::TopK | Self::MinP | Self::TopA
        )
    }
}

/// Sampling acceptance flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSupport {
    pub temperature: bool,
    pub top_p: bool,
    pub top_k: bool,
    pub min_p: bool,
    pub top_a: bool,
    pub frequency_penalty: bool,
    pub presence_penalty: bool,
    pub repetition_penalty: bool,
    pub seed: bool,
    pub logit_bias: bool,
}

impl SamplingSupport {
    pub fn supports(&self, key: SamplingKey) -> bool {
        match key {
            SamplingKey::Temperature => self.temperature,
            SamplingKey::TopP => self.top_p,
            SamplingKey::TopK => self.top_k,
            SamplingKey::MinP => self.min_p,
            SamplingKey::TopA => self.top_a,
            SamplingKey::FrequencyPenalty => self.frequency_penalty,
            SamplingKey::PresencePenalty => self.presence_penalty,
            SamplingKey::RepetitionPenalty => self.repetition_penalty,
            SamplingKey::Seed => self.seed,
            SamplingKey::LogitBias => self.logit_bias,
        }
    }

    pub(crate) fn set(&mut self, key: SamplingKey, value: bool) {
        let slot = match key {
            SamplingKey::Temperature => &mut self.temperature,
            SamplingKey::TopP => &mut self.top_p,
            SamplingKey::TopK => &mut self.top_k,
            SamplingKey::MinP => &mut self.min_p,
            SamplingKey::TopA => &mut self.top_a,
            SamplingKey::FrequencyPenalty => &mut self.frequency_penalty,
            SamplingKey::PresencePenalty => &mut self.presence_penalty,
            SamplingKey::RepetitionPenalty => &mut self.repetition_penalty,
            SamplingKey::Seed => &mut self.seed,
            SamplingKey::LogitBias => &mut self.logit_bias,
        };
        *slot = value;
    }
}

/// Length acceptance flags and the model's absolute completion ceiling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthSupport {
    pub max_tokens: bool,
    pub stop: bool,
    pub verbosity: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningDescriptor {
    /// `reasoning.effort` / `reasoning.exclude` are accepted.
    pub supports_reasoning_param: bool,
    /// `reasoning.max_tokens` is accepted.
    pub supports_max_reasoning_tokens: bool,
    /// The legacy `include_reasoning` compatibility field is declared.
    pub supports_include_reasoning: bool,
    pub returns_visible_reasoning: VisibleReasoning,
    pub reasoning_class: ReasoningClass,
    pub max_tokens_policy: MaxTokensPolicy,
}

/// Per-model generation capability, immutable for one catalog sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGenerationCapability {
    #[serde(rename = "id")]
    pub model_id: String,
    #[serde(default)]
    pub sampling: SamplingSupport,
    #[serde(default)]
    pub length: LengthSupport,
    #[serde(default)]
    pub reasoning: ReasoningDescriptor,
}

impl ModelGenerationCapability {
    /// Capability used for models the catalog does not know: every flag false,
    /// class C, visibility unknown.
    pub fn deny_all(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            sampling: SamplingSupport::default(),
            length: LengthSupport::default(),
            reasoning: ReasoningDescriptor::default(),
        }
    }

    pub fn reasoning_class(&self) -> ReasoningClass {
        self.reasoning.reasoning_class
    }

    /// Absolute completion-token ceiling declared by the upstream catalog.
    pub fn completion_ceiling(&self) -> Option<u32> {
        self.length.max_completion_tokens
    }
}
