//! Length sub-adapter: outgoing `max_tokens` ceiling, `stop` and `verbosity`.

use super::{Diagnostics, RequestFragment, Warning, NOT_SUPPORTED};
use crate::capability::ModelGenerationCapability;
use crate::config::LengthConfig;

/// `reasoning_ceiling` is the ceiling a class-A reasoning budget requires; when
/// present it wins over the caller's own `max_tokens`.
pub(crate) fn apply(
    cfg: Option<&LengthConfig>,
    cap: &ModelGenerationCapability,
    reasoning_ceiling: Option<u32>,
    fragment: &mut RequestFragment,
    diag: &mut Diagnostics,
) {
    let requested = cfg.and_then(|c| c.max_tokens);

    match reasoning_ceiling {
        Some(ceiling) => apply_reasoning_ceiling(ceiling, requested, cap, fragment, diag),
        None => {
            if let Some(max_tokens) = requested {
                apply_caller_max_tokens(max_tokens, cap, fragment, diag);
            }
        }
    }

    let Some(cfg) = cfg else {
        return;
    };

    if let Some(stop) = &cfg.stop {
        if !cap.length.stop {
            diag.ignore("stop", NOT_SUPPORTED);
        } else if stop.is_empty() {
            diag.ignore("stop", "empty");
        } else {
            fragment.stop = Some(stop.clone());
        }
    }

    if let Some(verbosity) = &cfg.verbosity {
        if !cap.length.verbosity {
            diag.ignore("verbosity", NOT_SUPPORTED);
        } else if verbosity.trim().is_empty() {
            diag.ignore("verbosity", "empty");
        } else {
            fragment.verbosity = Some(verbosity.clone());
        }
    }
}

fn apply_reasoning_ceiling(
    ceiling: u32,
    requested: Option<u32>,
    cap: &ModelGenerationCapability,
    fragment: &mut RequestFragment,
    diag: &mut Diagnostics,
) {
    if !cap.length.max_tokens {
        diag.ignore("max_tokens", NOT_SUPPORTED);
        diag.warn(Warning::fallback(
            "max_tokens",
            format!(
                "reasoning budget needs max_tokens {} but the model does not accept max_tokens; \
                 the budget may consume the whole completion",
                ceiling
            ),
        ));
        return;
    }

    match requested {
        Some(r) if r != ceiling => diag.warn(
            Warning::fallback(
                "max_tokens",
                format!(
                    "max_tokens {} replaced by {} to stay above the reasoning budget",
                    r, ceiling
                ),
            )
            .with_details(serde_json::json!({ "original": r, "applied": ceiling })),
        ),
        _ => {}
    }
    fragment.max_tokens = Some(ceiling);
}

fn apply_caller_max_tokens(
    max_tokens: u32,
    cap: &ModelGenerationCapability,
    fragment: &mut RequestFragment,
    diag: &mut Diagnostics,
) {
    if !cap.length.max_tokens {
        diag.ignore("max_tokens", NOT_SUPPORTED);
        return;
    }
    if max_tokens == 0 {
        diag.ignore("max_tokens", "must be positive");
        return;
    }
    let value = match cap.completion_ceiling() {
        Some(model_max) if max_tokens > model_max => {
            diag.warn(Warning::clipped(
                "max_tokens",
                max_tokens,
                model_max,
                Some("model ceiling"),
            ));
            model_max
        }
        _ => max_tokens,
    };
    fragment.max_tokens = Some(value);
}
