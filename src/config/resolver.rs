//! `auto` resolution for the reasoning section.

use super::{ControlMode, Effort, ReasoningConfig};
use crate::capability::{ModelGenerationCapability, ReasoningClass};

/// A concrete reasoning mode. There is no `auto` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedMode {
    Disabled,
    Effort(Effort),
    MaxTokens(u32),
}

/// Reasoning intent after `auto` (and incomplete modes) have been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningResolvedConfig {
    /// What the caller asked for; kept so the encoder can report substitutions.
    pub requested: ControlMode,
    pub mode: ResolvedMode,
    pub max_completion_tokens: Option<u32>,
    pub show_reasoning_content: Option<bool>,
}

impl ReasoningResolvedConfig {
    pub fn resolve(cfg: &ReasoningConfig, cap: &ModelGenerationCapability) -> Self {
        let requested = cfg.control_mode();
        let effort_mode = |e: Effort| match e {
            Effort::None => ResolvedMode::Disabled,
            e => ResolvedMode::Effort(e),
        };

        let mode = match requested {
            ControlMode::Disabled => ResolvedMode::Disabled,
            ControlMode::Effort => effort_mode(cfg.effort.unwrap_or(Effort::Medium)),
            ControlMode::MaxTokens => match cfg.max_reasoning_tokens {
                Some(v) => ResolvedMode::MaxTokens(v),
                None => effort_mode(cfg.effort.unwrap_or(Effort::Medium)),
            },
            ControlMode::Auto => {
                if cap.reasoning_class() == ReasoningClass::C {
                    ResolvedMode::Disabled
                } else {
                    match (cfg.max_reasoning_tokens, cfg.effort) {
                        (Some(v), _) if cap.reasoning.supports_max_reasoning_tokens => {
                            ResolvedMode::MaxTokens(v)
                        }
                        (_, Some(e)) => effort_mode(e),
                        (Some(v), None) => effort_mode(effort_for_budget(v)),
                        (None, None) => ResolvedMode::Effort(Effort::Medium),
                    }
                }
            }
        };

        Self {
            requested,
            mode,
            max_completion_tokens: cfg.max_completion_tokens,
            show_reasoning_content: cfg.show_reasoning_content,
        }
    }
}

/// Effort level closest to an explicit token budget.
pub fn effort_for_budget(tokens: u32) -> Effort {
    match tokens {
        0 => Effort::None,
        1..=2048 => Effort::Low,
        2049..=8192 => Effort::Medium,
        _ => Effort::High,
    }
}
