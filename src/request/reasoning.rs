//! Reasoning sub-adapter: a small state machine over the model's reasoning class.
//!
//! - Class C: nothing is encoded and an `unsupported` warning is always emitted.
//! - Class A: effort is passed through; an explicit budget is clamped into
//!   `[REASONING_BUDGET_MIN, REASONING_BUDGET_MAX]` and forces an outer length
//!   ceiling strictly above it.
//! - Class B: effort is passed through; an explicit budget is only a hint, bounded
//!   by the model's own completion ceiling, and never touches the length ceiling.

use super::{Diagnostics, ReasoningFragment, RequestFragment, Warning, NOT_SUPPORTED};
use crate::capability::{
    MaxTokensPolicy, ModelGenerationCapability, ReasoningClass, VisibleReasoning,
};
use crate::config::{
    effort_for_budget, AdapterPolicy, ControlMode, Effort, ReasoningConfig,
    ReasoningResolvedConfig, ResolvedMode,
};

pub const REASONING_BUDGET_MIN: u32 = 1024;
pub const REASONING_BUDGET_MAX: u32 = 32000;

/// Encode the reasoning section. Returns the outer length ceiling a class-A budget
/// requires, if any.
pub(crate) fn apply(
    cfg: &ReasoningConfig,
    cap: &ModelGenerationCapability,
    policy: &AdapterPolicy,
    fragment: &mut RequestFragment,
    diag: &mut Diagnostics,
) -> Option<u32> {
    let class = cap.reasoning_class();
    if class == ReasoningClass::C {
        diag.warn(Warning::unsupported(
            "reasoning",
            format!(
                "model {} does not accept reasoning parameters; requested mode '{:?}' dropped",
                cap.model_id,
                cfg.control_mode()
            ),
        ));
        return None;
    }

    let resolved = ReasoningResolvedConfig::resolve(cfg, cap);
    if resolved.requested == ControlMode::MaxTokens
        && !matches!(resolved.mode, ResolvedMode::MaxTokens(_))
    {
        diag.warn(Warning::fallback(
            "reasoning.max_tokens",
            "max_tokens mode requested without max_reasoning_tokens; using effort instead",
        ));
    }

    let mut reasoning = ReasoningFragment::default();
    let mut ceiling = None;

    match resolved.mode {
        ResolvedMode::Disabled => set_effort(&mut reasoning, Effort::None, cap, diag),
        ResolvedMode::Effort(effort) => set_effort(&mut reasoning, effort, cap, diag),
        ResolvedMode::MaxTokens(requested) if !cap.reasoning.supports_max_reasoning_tokens => {
            diag.ignore("reasoning.max_tokens", NOT_SUPPORTED);
            let effort = effort_for_budget(requested);
            diag.warn(Warning::fallback(
                "reasoning.max_tokens",
                format!(
                    "explicit reasoning budget {} not accepted; sent effort '{}' instead",
                    requested,
                    effort.as_str()
                ),
            ));
            set_effort(&mut reasoning, effort, cap, diag);
        }
        ResolvedMode::MaxTokens(requested) => match class {
            ReasoningClass::A => {
                let budget = requested.clamp(REASONING_BUDGET_MIN, REASONING_BUDGET_MAX);
                if budget != requested {
                    diag.warn(Warning::clipped(
                        "reasoning.max_tokens",
                        requested,
                        budget,
                        None,
                    ));
                }
                reasoning.max_tokens = Some(budget);
                ceiling = Some(length_ceiling_above(
                    budget,
                    resolved.max_completion_tokens,
                    cap,
                    policy,
                    diag,
                ));
            }
            _ if requested == 0 => diag.ignore("reasoning.max_tokens", "must be positive"),
            _ => {
                let hint = match cap.completion_ceiling() {
                    Some(model_max) if requested > model_max => {
                        diag.warn(Warning::clipped(
                            "reasoning.max_tokens",
                            requested,
                            model_max,
                            Some("model ceiling"),
                        ));
                        model_max
                    }
                    _ => requested,
                };
                reasoning.max_tokens = Some(hint);
            }
        },
    }

    if let Some(show) = resolved.show_reasoning_content {
        apply_visibility(show, cap, &mut reasoning, fragment, diag);
    }

    if !reasoning.is_empty() {
        fragment.reasoning = Some(reasoning);
    }
    ceiling
}

fn set_effort(
    reasoning: &mut ReasoningFragment,
    effort: Effort,
    cap: &ModelGenerationCapability,
    diag: &mut Diagnostics,
) {
    if cap.reasoning.supports_reasoning_param {
        reasoning.effort = Some(effort);
    } else {
        diag.ignore("reasoning.effort", NOT_SUPPORTED);
    }
}

/// Outer `max_tokens` for a class-A budget. Always strictly greater than `budget`.
fn length_ceiling_above(
    budget: u32,
    max_completion_tokens: Option<u32>,
    cap: &ModelGenerationCapability,
    policy: &AdapterPolicy,
    diag: &mut Diagnostics,
) -> u32 {
    let headroom = match cap.reasoning.max_tokens_policy {
        MaxTokensPolicy::ReserveAboveReasoning => policy.answer_headroom.max(1),
        MaxTokensPolicy::Passthrough => 1,
    };

    let mut ceiling = match max_completion_tokens {
        Some(m) if m > budget => m,
        Some(m) => {
            let raised = budget.saturating_add(headroom);
            diag.warn(
                Warning::fallback(
                    "max_tokens",
                    format!(
                        "max_completion_tokens {} does not exceed reasoning budget {}; \
                         raised to {}",
                        m, budget, raised
                    ),
                )
                .with_details(serde_json::json!({
                    "original": m,
                    "budget": budget,
                    "raised": raised
                })),
            );
            raised
        }
        None => budget.saturating_add(headroom),
    };

    if let Some(model_max) = cap.completion_ceiling() {
        if ceiling > model_max {
            if model_max > budget {
                diag.warn(Warning::clipped(
                    "max_tokens",
                    ceiling,
                    model_max,
                    Some("model ceiling"),
                ));
                ceiling = model_max;
            } else {
                tracing::warn!(
                    model = cap.model_id.as_str(),
                    budget,
                    model_max,
                    "model ceiling does not exceed reasoning budget; keeping length above budget"
                );
            }
        }
    }
    ceiling
}

fn apply_visibility(
    show: bool,
    cap: &ModelGenerationCapability,
    reasoning: &mut ReasoningFragment,
    fragment: &mut RequestFragment,
    diag: &mut Diagnostics,
) {
    if cap.reasoning.supports_reasoning_param {
        reasoning.exclude = Some(!show);
    } else {
        diag.ignore("reasoning.exclude", NOT_SUPPORTED);
    }
    if show && cap.reasoning.supports_include_reasoning {
        fragment.include_reasoning = Some(true);
    }

    let visibility = cap.reasoning.returns_visible_reasoning;
    if visibility.is_confirmed() {
        return;
    }
    if visibility == VisibleReasoning::No {
        diag.warn(Warning::ignored(
            "reasoning.exclude",
            format!(
                "model {} never returns reasoning text; \
                 the visibility setting has no observable effect",
                cap.model_id
            ),
        ));
    } else {
        tracing::debug!(
            model = cap.model_id.as_str(),
            visibility = visibility.diagnostic_label(),
            "reasoning visibility requested on a model whose reasoning output is not verified"
        );
    }
}
