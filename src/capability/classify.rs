//! Capability classification from upstream catalog entries.
//!
//! Only upstream-declared fields are consulted: the declared parameter list, the
//! architecture's output modalities, the price table and the declared completion
//! ceiling. Model ids are matched solely against the reviewed allow-lists below;
//! no other inspection of the id or display name takes place.

use super::{
    LengthSupport, MaxTokensPolicy, ModelGenerationCapability, ReasoningClass,
    ReasoningDescriptor, SamplingKey, SamplingSupport, VisibleReasoning,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reviewed families that accept an explicit, hard-bounded reasoning budget.
const BUDGET_FAMILY_PATTERNS: &[&str] = &[
    r"^anthropic/claude-3\.7-sonnet(:thinking)?$",
    r"^anthropic/claude-(sonnet|opus)-4(\.\d+)?$",
    r"^anthropic/claude-haiku-4(\.\d+)?$",
    r"^google/gemini-2\.5-(pro|flash|flash-lite)(-preview.*)?$",
    r"^qwen/qwen3-[a-z0-9.-]+$",
];

/// Reviewed families that reason internally but never return the reasoning text.
const HIDDEN_REASONING_PATTERNS: &[&str] = &[
    r"^openai/o[134](-mini|-pro)?(-high)?$",
    r"^openai/gpt-5(-mini|-nano)?$",
];

static BUDGET_FAMILIES: Lazy<Vec<Regex>> = Lazy::new(|| compile(BUDGET_FAMILY_PATTERNS));
static HIDDEN_REASONING: Lazy<Vec<Regex>> = Lazy::new(|| compile(HIDDEN_REASONING_PATTERNS));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn matches_any(list: &[Regex], id: &str) -> bool {
    list.iter().any(|re| re.is_match(id))
}

/// Upstream catalog entry, as published by the completion API's model listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamModel {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub supported_parameters: Vec<String>,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub top_provider: TopProvider,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    /// Compact form, e.g. `"text+image->text"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    #[serde(default)]
    pub input_modalities: Vec<String>,
    #[serde(default)]
    pub output_modalities: Vec<String>,
}

impl Architecture {
    /// Whether the model declares text output.
    ///
    /// An entry that declares no modalities at all is judged by its parameter list
    /// alone.
    pub fn outputs_text(&self) -> bool {
        if !self.output_modalities.is_empty() {
            return self.output_modalities.iter().any(|m| m == "text");
        }
        match self.modality.as_deref() {
            Some(m) => m
                .split_once("->")
                .map(|(_, out)| out.split('+').any(|part| part.trim() == "text"))
                .unwrap_or(false),
            None => true,
        }
    }
}

/// Price table; upstream publishes prices as decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_reasoning: Option<Value>,
}

impl Pricing {
    pub fn internal_reasoning_price(&self) -> Option<f64> {
        self.internal_reasoning.as_ref().and_then(price_value)
    }
}

fn price_value(v: &Value) -> Option<f64> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|p| p.is_finite())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProvider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
}

impl UpstreamModel {
    fn declares(&self, param: &str) -> bool {
        self.supported_parameters.iter().any(|p| p == param)
    }
}

/// Derive a [`ModelGenerationCapability`] from an upstream catalog entry.
pub fn classify(model: &UpstreamModel) -> ModelGenerationCapability {
    let mut sampling = SamplingSupport::default();
    for key in SamplingKey::ALL {
        sampling.set(key, model.declares(key.as_str()));
    }

    let length = LengthSupport {
        max_tokens: model.declares("max_tokens"),
        stop: model.declares("stop"),
        verbosity: model.declares("verbosity"),
        max_completion_tokens: model.top_provider.max_completion_tokens.filter(|&n| n > 0),
    };

    let reasoning_declared = model.declares("reasoning") && model.architecture.outputs_text();
    let token_billed = model
        .pricing
        .internal_reasoning_price()
        .map_or(false, |p| p > 0.0);

    let reasoning_class = if !reasoning_declared {
        ReasoningClass::C
    } else if matches_any(&BUDGET_FAMILIES, &model.id) {
        ReasoningClass::A
    } else {
        ReasoningClass::B
    };

    let reasoning = match reasoning_class {
        ReasoningClass::C => ReasoningDescriptor {
            returns_visible_reasoning: VisibleReasoning::No,
            ..ReasoningDescriptor::default()
        },
        class => {
            let supports_include_reasoning = model.declares("include_reasoning");
            let returns_visible_reasoning = if matches_any(&HIDDEN_REASONING, &model.id) {
                VisibleReasoning::No
            } else if supports_include_reasoning && token_billed {
                VisibleReasoning::Yes
            } else {
                VisibleReasoning::Unknown
            };
            ReasoningDescriptor {
                supports_reasoning_param: true,
                supports_max_reasoning_tokens: class == ReasoningClass::A || token_billed,
                supports_include_reasoning,
                returns_visible_reasoning,
                reasoning_class: class,
                max_tokens_policy: if class == ReasoningClass::A {
                    MaxTokensPolicy::ReserveAboveReasoning
                } else {
                    MaxTokensPolicy::Passthrough
                },
            }
        }
    };

    tracing::debug!(
        model = model.id.as_str(),
        class = %reasoning_class,
        visible = reasoning.returns_visible_reasoning.diagnostic_label(),
        "classified upstream model"
    );

    ModelGenerationCapability {
        model_id: model.id.clone(),
        sampling,
        length,
        reasoning,
    }
}
