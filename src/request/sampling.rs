//! Sampling sub-adapter.
//!
//! Fixed clamp ranges: temperature `[0, 2]`; top_p, min_p, top_a `[0, 1]`;
//! frequency/presence penalty `[-2, 2]`; repetition_penalty `[0, 2]`; top_k `>= 0`.

use super::{Diagnostics, RequestFragment, Warning, NOT_SUPPORTED};
use crate::capability::{SamplingKey, SamplingSupport};
use crate::config::{AdapterPolicy, SamplingConfig};
use serde_json::json;
use std::collections::BTreeMap;

/// Inclusive clamp range for float-valued keys.
pub fn range(key: SamplingKey) -> Option<(f64, f64)> {
    match key {
        SamplingKey::Temperature => Some((0.0, 2.0)),
        SamplingKey::TopP | SamplingKey::MinP | SamplingKey::TopA => Some((0.0, 1.0)),
        SamplingKey::FrequencyPenalty | SamplingKey::PresencePenalty => Some((-2.0, 2.0)),
        SamplingKey::RepetitionPenalty => Some((0.0, 2.0)),
        SamplingKey::TopK | SamplingKey::Seed | SamplingKey::LogitBias => None,
    }
}

fn is_set(cfg: &SamplingConfig, key: SamplingKey) -> bool {
    match key {
        SamplingKey::TopK => cfg.top_k.is_some(),
        SamplingKey::Seed => cfg.seed.is_some(),
        SamplingKey::LogitBias => cfg.logit_bias.is_some(),
        other => float_value(cfg, other).is_some(),
    }
}

fn float_value(cfg: &SamplingConfig, key: SamplingKey) -> Option<f64> {
    match key {
        SamplingKey::Temperature => cfg.temperature,
        SamplingKey::TopP => cfg.top_p,
        SamplingKey::MinP => cfg.min_p,
        SamplingKey::TopA => cfg.top_a,
        SamplingKey::FrequencyPenalty => cfg.frequency_penalty,
        SamplingKey::PresencePenalty => cfg.presence_penalty,
        SamplingKey::RepetitionPenalty => cfg.repetition_penalty,
        SamplingKey::TopK | SamplingKey::Seed | SamplingKey::LogitBias => None,
    }
}

fn set_float(fragment: &mut RequestFragment, key: SamplingKey, value: f64) {
    let slot = match key {
        SamplingKey::Temperature => &mut fragment.temperature,
        SamplingKey::TopP => &mut fragment.top_p,
        SamplingKey::MinP => &mut fragment.min_p,
        SamplingKey::TopA => &mut fragment.top_a,
        SamplingKey::FrequencyPenalty => &mut fragment.frequency_penalty,
        SamplingKey::PresencePenalty => &mut fragment.presence_penalty,
        SamplingKey::RepetitionPenalty => &mut fragment.repetition_penalty,
        SamplingKey::TopK | SamplingKey::Seed | SamplingKey::LogitBias => return,
    };
    *slot = Some(value);
}

fn is_written(fragment: &RequestFragment, key: SamplingKey) -> bool {
    match key {
        SamplingKey::Temperature => fragment.temperature.is_some(),
        SamplingKey::TopP => fragment.top_p.is_some(),
        SamplingKey::TopK => fragment.top_k.is_some(),
        SamplingKey::MinP => fragment.min_p.is_some(),
        SamplingKey::TopA => fragment.top_a.is_some(),
        SamplingKey::FrequencyPenalty => fragment.frequency_penalty.is_some(),
        SamplingKey::PresencePenalty => fragment.presence_penalty.is_some(),
        SamplingKey::RepetitionPenalty => fragment.repetition_penalty.is_some(),
        SamplingKey::Seed => fragment.seed.is_some(),
        SamplingKey::LogitBias => fragment.logit_bias.is_some(),
    }
}

fn clamp_float(key: SamplingKey, raw: f64, diag: &mut Diagnostics) -> Option<f64> {
    let name = key.as_str();
    if !raw.is_finite() {
        diag.warn(
            Warning::ignored(name, format!("{} discarded: non-finite value", name))
                .with_details(json!({ "original": raw.to_string() })),
        );
        return None;
    }
    let Some((lo, hi)) = range(key) else {
        return Some(raw);
    };
    let clamped = raw.clamp(lo, hi);
    if clamped != raw {
        diag.warn(Warning::clipped(name, raw, clamped, None));
    }
    Some(clamped)
}

fn filter_logit_bias(
    bias: &BTreeMap<String, f64>,
    diag: &mut Diagnostics,
) -> BTreeMap<String, f64> {
    let mut kept = BTreeMap::new();
    for (token, value) in bias {
        if value.is_finite() {
            kept.insert(token.clone(), *value);
        } else {
            diag.warn(
                Warning::ignored(
                    "logit_bias",
                    format!("logit_bias entry {} discarded: non-finite value", token),
                )
                .with_details(json!({ "token": token, "original": value.to_string() })),
            );
        }
    }
    kept
}

pub(crate) fn apply(
    cfg: &SamplingConfig,
    support: &SamplingSupport,
    policy: &AdapterPolicy,
    fragment: &mut RequestFragment,
    diag: &mut Diagnostics,
) {
    for key in SamplingKey::ALL {
        if !is_set(cfg, key) {
            continue;
        }
        if !support.supports(key) {
            diag.ignore(key.as_str(), NOT_SUPPORTED);
            continue;
        }
        match key {
            SamplingKey::TopK => {
                if let Some(k) = cfg.top_k {
                    if k < 0 {
                        diag.warn(Warning::clipped("top_k", k, 0, None));
                        fragment.top_k = Some(0);
                    } else {
                        fragment.top_k = Some(k);
                    }
                }
            }
            SamplingKey::Seed => fragment.seed = cfg.seed,
            SamplingKey::LogitBias => {
                if let Some(bias) = &cfg.logit_bias {
                    let kept = filter_logit_bias(bias, diag);
                    if !kept.is_empty() {
                        fragment.logit_bias = Some(kept);
                    }
                }
            }
            float_key => {
                if let Some(raw) = float_value(cfg, float_key) {
                    if let Some(v) = clamp_float(float_key, raw, diag) {
                        set_float(fragment, float_key, v);
                    }
                }
            }
        }
    }

    let written: &RequestFragment = fragment;
    let shaping: Vec<&'static str> = SamplingKey::ALL
        .into_iter()
        .filter(|k| k.is_distribution_shaping() && is_written(written, *k))
        .map(SamplingKey::as_str)
        .collect();
    if shaping.len() > policy.max_concurrent_samplers {
        diag.warn(
            Warning::fallback(
                "sampling",
                format!(
                    "{} sampling parameters set together ({}); they may interfere, all are sent",
                    shaping.len(),
                    shaping.join(", ")
                ),
            )
            .with_details(json!({ "keys": shaping })),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::WarningKind;

    fn all_supported() -> SamplingSupport {
        let mut s = SamplingSupport::default();
        for key in SamplingKey::ALL {
            s.set(key, true);
        }
        s
    }

    fn run(cfg: &SamplingConfig, support: &SamplingSupport) -> (RequestFragment, Diagnostics) {
        let mut fragment = RequestFragment::default();
        let mut diag = Diagnostics::default();
        apply(cfg, support, &AdapterPolicy::default(), &mut fragment, &mut diag);
        (fragment, diag)
    }

    #[test]
    fn test_each_range_is_enforced() {
        let cfg = SamplingConfig {
            temperature: Some(-1.0),
            top_p: Some(1.5),
            frequency_penalty: Some(-3.0),
            presence_penalty: Some(2.5),
            repetition_penalty: Some(4.0),
            ..Default::default()
        };
        let (f, diag) = run(&cfg, &all_supported());
        assert_eq!(f.temperature, Some(0.0));
        assert_eq!(f.top_p, Some(1.0));
        assert_eq!(f.frequency_penalty, Some(-2.0));
        assert_eq!(f.presence_penalty, Some(2.0));
        assert_eq!(f.repetition_penalty, Some(2.0));
        assert_eq!(diag.warnings.len(), 5);
        assert!(diag.warnings.iter().all(|w| w.kind == WarningKind::Clipped));
    }

    #[test]
    fn test_non_finite_is_discarded() {
        let cfg = SamplingConfig {
            temperature: Some(f64::NAN),
            min_p: Some(f64::INFINITY),
            ..Default::default()
        };
        let (f, diag) = run(&cfg, &all_supported());
        assert!(f.temperature.is_none());
        assert!(f.min_p.is_none());
        assert_eq!(diag.warnings.len(), 2);
        assert!(diag.warnings.iter().all(|w| w.kind == WarningKind::Ignored));
        assert!(diag.ignored.is_empty());
    }

    #[test]
    fn test_negative_top_k_clamped_to_zero() {
        let cfg = SamplingConfig {
            top_k: Some(-4),
            ..Default::default()
        };
        let (f, diag) = run(&cfg, &all_supported());
        assert_eq!(f.top_k, Some(0));
        assert_eq!(diag.warnings[0].kind, WarningKind::Clipped);
    }

    #[test]
    fn test_interference_advisory_keeps_values() {
        let cfg = SamplingConfig {
            temperature: Some(0.8),
            top_p: Some(0.9),
            top_k: Some(40),
            ..Default::default()
        };
        let (f, diag) = run(&cfg, &all_supported());
        assert_eq!(f.temperature, Some(0.8));
        assert_eq!(f.top_p, Some(0.9));
        assert_eq!(f.top_k, Some(40));
        assert_eq!(diag.warnings.len(), 1);
        assert_eq!(diag.warnings[0].kind, WarningKind::Fallback);
        assert_eq!(diag.warnings[0].details["keys"], json!(["temperature", "top_p", "top_k"]));
    }

    #[test]
    fn test_two_samplers_do_not_trigger_advisory() {
        let cfg = SamplingConfig {
            temperature: Some(0.8),
            top_p: Some(0.9),
            seed: Some(1),
            ..Default::default()
        };
        let (_, diag) = run(&cfg, &all_supported());
        assert!(diag.warnings.is_empty());
    }

    #[test]
    fn test_logit_bias_drops_non_finite_entries() {
        let mut bias = BTreeMap::new();
        bias.insert("50256".to_string(), -100.0);
        bias.insert("13".to_string(), f64::NAN);
        let cfg = SamplingConfig {
            logit_bias: Some(bias),
            ..Default::default()
        };
        let (f, diag) = run(&cfg, &all_supported());
        let kept = f.logit_bias.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.get("50256"), Some(&-100.0));
        assert_eq!(diag.warnings.len(), 1);
    }

    #[test]
    fn test_logit_bias_omitted_when_nothing_survives() {
        let mut bias = BTreeMap::new();
        bias.insert("13".to_string(), f64::NAN);
        bias.insert("42".to_string(), f64::NEG_INFINITY);
        let cfg = SamplingConfig {
            logit_bias: Some(bias),
            ..Default::default()
        };
        let (f, diag) = run(&cfg, &all_supported());
        assert!(f.logit_bias.is_none());
        assert!(f.is_empty());
        assert_eq!(diag.warnings.len(), 2);
    }
}
