//! 生成配置层：抽象的、与厂商无关的生成意图及其合并规则。
//!
//! # Generation Configuration
//!
//! [`GenerationConfig`] is the provider-agnostic request intent: three optional
//! sections for sampling, length and reasoning. Caller overrides and stored
//! defaults are merged leaf by leaf with [`resolve_config`]; the override wins
//! wherever it sets a value.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`GenerationConfig`] | Abstract request intent |
//! | [`ReasoningConfig`] | Reasoning intent, may still say `auto` |
//! | [`ReasoningResolvedConfig`] | Reasoning intent with a concrete mode |
//! | [`AdapterPolicy`] | Tunable encoder policy constants |

mod policy;
mod resolver;

pub use policy::AdapterPolicy;
pub use resolver::{effort_for_budget, ReasoningResolvedConfig, ResolvedMode};

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Abstract generation intent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<LengthConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
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
    /// Token id → bias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<String>,
}

/// `stop` accepts a single sequence or a list, as on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(s) => s.is_empty(),
            Self::Many(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Disabled,
    Effort,
    MaxTokens,
    #[default]
    Auto,
}

/// Coarse reasoning intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Minimal,
    Low,
    Medium,
    High,
    None,
}

impl Effort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Unset means `auto`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_mode: Option<ControlMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<Effort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reasoning_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_reasoning_content: Option<bool>,
}

fn merge_section<T: Clone>(
    over: Option<&T>,
    defaults: Option<&T>,
    merge: impl FnOnce(&T, &T) -> T,
) -> Option<T> {
    match (over, defaults) {
        (Some(o), Some(d)) => Some(merge(o, d)),
        (Some(o), None) => Some(o.clone()),
        (None, Some(d)) => Some(d.clone()),
        (None, None) => None,
    }
}

impl SamplingConfig {
    fn merged_with(&self, d: &Self) -> Self {
        Self {
            temperature: self.temperature.or(d.temperature),
            top_p: self.top_p.or(d.top_p),
            top_k: self.top_k.or(d.top_k),
            min_p: self.min_p.or(d.min_p),
            top_a: self.top_a.or(d.top_a),
            frequency_penalty: self.frequency_penalty.or(d.frequency_penalty),
            presence_penalty: self.presence_penalty.or(d.presence_penalty),
            repetition_penalty: self.repetition_penalty.or(d.repetition_penalty),
            seed: self.seed.or(d.seed),
            logit_bias: self.logit_bias.clone().or_else(|| d.logit_bias.clone()),
        }
    }
}

impl LengthConfig {
    fn merged_with(&self, d: &Self) -> Self {
        Self {
            max_tokens: self.max_tokens.or(d.max_tokens),
            stop: self.stop.clone().or_else(|| d.stop.clone()),
            verbosity: self.verbosity.clone().or_else(|| d.verbosity.clone()),
        }
    }
}

impl ReasoningConfig {
    fn merged_with(&self, d: &Self) -> Self {
        Self {
            control_mode: self.control_mode.or(d.control_mode),
            effort: self.effort.or(d.effort),
            max_reasoning_tokens: self.max_reasoning_tokens.or(d.max_reasoning_tokens),
            max_completion_tokens: self.max_completion_tokens.or(d.max_completion_tokens),
            show_reasoning_content: self.show_reasoning_content.or(d.show_reasoning_content),
        }
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode.unwrap_or_default()
    }
}

impl GenerationConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a stored config; `.json` is parsed as JSON, anything else as YAML.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("json"))
        {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Merge with stored defaults; values set here win.
    pub fn merged_with(&self, defaults: &Self) -> Self {
        Self {
            sampling: merge_section(
                self.sampling.as_ref(),
                defaults.sampling.as_ref(),
                SamplingConfig::merged_with,
            ),
            length: merge_section(
                self.length.as_ref(),
                defaults.length.as_ref(),
                LengthConfig::merged_with,
            ),
            reasoning: merge_section(
                self.reasoning.as_ref(),
                defaults.reasoning.as_ref(),
                ReasoningConfig::merged_with,
            ),
        }
    }
}

/// Effective config for one request: caller overrides on top of stored defaults.
pub fn resolve_config(
    overrides: &GenerationConfig,
    defaults: &GenerationConfig,
) -> GenerationConfig {
    overrides.merged_with(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_per_leaf() {
        let defaults = GenerationConfig {
            sampling: Some(SamplingConfig {
                temperature: Some(0.7),
                top_p: Some(0.9),
                ..Default::default()
            }),
            length: Some(LengthConfig {
                max_tokens: Some(1024),
                ..Default::default()
            }),
            reasoning: None,
        };
        let overrides = GenerationConfig {
            sampling: Some(SamplingConfig {
                temperature: Some(0.2),
                ..Default::default()
            }),
            length: None,
            reasoning: Some(ReasoningConfig {
                effort: Some(Effort::High),
                ..Default::default()
            }),
        };

        let eff = resolve_config(&overrides, &defaults);
        let sampling = eff.sampling.unwrap();
        assert_eq!(sampling.temperature, Some(0.2));
        assert_eq!(sampling.top_p, Some(0.9));
        assert_eq!(eff.length.unwrap().max_tokens, Some(1024));
        let reasoning = eff.reasoning.unwrap();
        assert_eq!(reasoning.effort, Some(Effort::High));
        assert_eq!(reasoning.control_mode(), ControlMode::Auto);
    }

    #[test]
    fn test_empty_merge_stays_empty() {
        let eff = resolve_config(&GenerationConfig::default(), &GenerationConfig::default());
        assert_eq!(eff, GenerationConfig::default());
    }

    #[test]
    fn test_yaml_config() {
        let cfg = GenerationConfig::from_yaml_str(
            r#"
sampling:
  temperature: 0.4
length:
  stop: ["\n\n", "END"]
  verbosity: low
reasoning:
  control_mode: max_tokens
  max_reasoning_tokens: 4096
  show_reasoning_content: true
"#,
        )
        .unwrap();
        assert_eq!(
            cfg.length.as_ref().unwrap().stop,
            Some(StopSequences::Many(vec!["\n\n".into(), "END".into()]))
        );
        let r = cfg.reasoning.unwrap();
        assert_eq!(r.control_mode(), ControlMode::MaxTokens);
        assert_eq!(r.max_reasoning_tokens, Some(4096));
    }

    #[test]
    fn test_single_stop_sequence() {
        let cfg = GenerationConfig::from_json_str("{\"length\":{\"stop\":\"###\"}}").unwrap();
        assert_eq!(
            cfg.length.unwrap().stop,
            Some(StopSequences::One("###".into()))
        );
    }
}
