use gen_protocol_adapter::capability::{
    LengthSupport, MaxTokensPolicy, ReasoningDescriptor, SamplingKey, SamplingSupport,
};
use gen_protocol_adapter::config::{
    ControlMode, Effort, LengthConfig, ReasoningConfig, SamplingConfig,
};
use gen_protocol_adapter::{
    encode_request, resolve_config, AdapterPolicy, GenerationConfig, ModelGenerationCapability,
    ReasoningClass, RequestEncoder, VisibleReasoning, WarningKind,
};
use serde_json::json;

fn capability(class: ReasoningClass, ceiling: Option<u32>) -> ModelGenerationCapability {
    ModelGenerationCapability {
        model_id: "vendor/model".into(),
        sampling: SamplingSupport {
            temperature: true,
            top_p: true,
            min_p: true,
            seed: true,
            ..Default::default()
        },
        length: LengthSupport {
            max_tokens: true,
            stop: true,
            verbosity: false,
            max_completion_tokens: ceiling,
        },
        reasoning: ReasoningDescriptor {
            supports_reasoning_param: class != ReasoningClass::C,
            supports_max_reasoning_tokens: class != ReasoningClass::C,
            supports_include_reasoning: true,
            returns_visible_reasoning: VisibleReasoning::Yes,
            reasoning_class: class,
            max_tokens_policy: if class == ReasoningClass::A {
                MaxTokensPolicy::ReserveAboveReasoning
            } else {
                MaxTokensPolicy::Passthrough
            },
        },
    }
}

fn budget(v: u32) -> GenerationConfig {
    GenerationConfig {
        reasoning: Some(ReasoningConfig {
            control_mode: Some(ControlMode::MaxTokens),
            max_reasoning_tokens: Some(v),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn test_supported_in_range_key_passes_silently() {
    let cap = capability(ReasoningClass::C, None);
    let cfg = GenerationConfig {
        sampling: Some(SamplingConfig {
            temperature: Some(0.7),
            top_p: Some(0.95),
            seed: Some(42),
            ..Default::default()
        }),
        ..Default::default()
    };
    let out = encode_request("vendor/model", Some(&cap), &cfg);
    assert_eq!(
        out.request_fragment.to_value(),
        json!({"temperature": 0.7, "top_p": 0.95, "seed": 42})
    );
    assert!(out.warnings.is_empty());
    assert!(out.ignored_parameters.is_empty());
}

#[test]
fn test_unsupported_key_ignored_exactly_once() {
    let cap = capability(ReasoningClass::C, None);
    let cfg = GenerationConfig {
        sampling: Some(SamplingConfig {
            top_k: Some(40),
            frequency_penalty: Some(0.5),
            repetition_penalty: Some(1.1),
            ..Default::default()
        }),
        ..Default::default()
    };
    let out = encode_request("vendor/model", Some(&cap), &cfg);
    assert!(out.request_fragment.is_empty());
    for key in [
        SamplingKey::TopK,
        SamplingKey::FrequencyPenalty,
        SamplingKey::RepetitionPenalty,
    ] {
        let hits = out
            .ignored_parameters
            .iter()
            .filter(|p| p.key == key.as_str())
            .count();
        assert_eq!(hits, 1, "{}", key.as_str());
        assert_eq!(
            out.ignored_parameters
                .iter()
                .find(|p| p.key == key.as_str())
                .map(|p| p.reason.as_str()),
            Some("not supported")
        );
    }
}

#[test]
fn test_encoding_is_deterministic() {
    let cap = capability(ReasoningClass::A, Some(64000));
    let cfg = GenerationConfig {
        sampling: Some(SamplingConfig {
            temperature: Some(3.0),
            top_p: Some(0.5),
            min_p: Some(0.1),
            ..Default::default()
        }),
        length: Some(LengthConfig {
            max_tokens: Some(100),
            ..Default::default()
        }),
        reasoning: Some(ReasoningConfig {
            control_mode: Some(ControlMode::MaxTokens),
            max_reasoning_tokens: Some(50),
            show_reasoning_content: Some(true),
            ..Default::default()
        }),
    };
    let a = encode_request("vendor/model", Some(&cap), &cfg);
    let b = encode_request("vendor/model", Some(&cap), &cfg);
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_class_a_budget_window_and_ordering() {
    let cap = capability(ReasoningClass::A, Some(64000));
    for v in [1, 500, 1024, 5000, 32000, 32001, 40000, 1_000_000] {
        let out = encode_request("vendor/model", Some(&cap), &budget(v));
        let fragment = &out.request_fragment;
        let emitted = fragment.reasoning.as_ref().and_then(|r| r.max_tokens).unwrap();
        assert_eq!(emitted, v.clamp(1024, 32000), "budget {}", v);
        assert!(fragment.max_tokens.unwrap() > emitted, "budget {}", v);
    }
}

#[test]
fn test_class_a_ordering_holds_with_tight_model_ceiling() {
    let cap = capability(ReasoningClass::A, Some(8000));
    let out = encode_request("vendor/model", Some(&cap), &budget(20000));
    let fragment = &out.request_fragment;
    let emitted = fragment.reasoning.as_ref().and_then(|r| r.max_tokens).unwrap();
    assert!(fragment.max_tokens.unwrap() > emitted);
}

#[test]
fn test_class_b_hint_never_windowed() {
    let cap = capability(ReasoningClass::B, Some(16000));
    for v in [1, 500, 5000, 16000] {
        let out = encode_request("vendor/model", Some(&cap), &budget(v));
        let emitted = out.request_fragment.reasoning.as_ref().and_then(|r| r.max_tokens);
        assert_eq!(emitted, Some(v));
        assert!(out.request_fragment.max_tokens.is_none());
    }
    let out = encode_request("vendor/model", Some(&cap), &budget(40000));
    let emitted = out.request_fragment.reasoning.as_ref().and_then(|r| r.max_tokens);
    assert_eq!(emitted, Some(16000));
    assert_eq!(out.warnings_of(WarningKind::Clipped).count(), 1);
}

#[test]
fn test_class_c_every_mode_is_unsupported() {
    let cap = capability(ReasoningClass::C, None);
    for mode in [
        ControlMode::Disabled,
        ControlMode::Effort,
        ControlMode::MaxTokens,
        ControlMode::Auto,
    ] {
        let cfg = GenerationConfig {
            reasoning: Some(ReasoningConfig {
                control_mode: Some(mode),
                effort: Some(Effort::High),
                max_reasoning_tokens: Some(8000),
                ..Default::default()
            }),
            ..Default::default()
        };
        let out = encode_request("vendor/model", Some(&cap), &cfg);
        assert!(out.request_fragment.reasoning.is_none());
        assert_eq!(out.warnings_of(WarningKind::Unsupported).count(), 1);
    }
}

#[test]
fn test_scenario_clamped_temperature_and_ignored_top_k() {
    let cap = capability(ReasoningClass::C, None);
    let cfg = GenerationConfig {
        sampling: Some(SamplingConfig {
            temperature: Some(2.5),
            top_k: Some(40),
            ..Default::default()
        }),
        ..Default::default()
    };
    let out = encode_request("vendor/model", Some(&cap), &cfg);
    assert_eq!(out.request_fragment.to_value(), json!({"temperature": 2.0}));
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].kind, WarningKind::Clipped);
    assert_eq!(out.warnings[0].details["original"], json!(2.5));
    assert_eq!(out.warnings[0].details["clipped"], json!(2.0));
    assert_eq!(out.ignored_parameters.len(), 1);
    assert!(out.is_ignored("top_k"));
}

#[test]
fn test_scenario_class_a_oversized_budget() {
    let cap = capability(ReasoningClass::A, Some(64000));
    let out = encode_request("vendor/model", Some(&cap), &budget(40000));
    let fragment = &out.request_fragment;
    assert_eq!(fragment.reasoning.as_ref().unwrap().max_tokens, Some(32000));
    assert!(fragment.max_tokens.unwrap() > 32000);
    assert_eq!(out.warnings.len(), 1);
    assert_eq!(out.warnings[0].kind, WarningKind::Clipped);
    assert!(out.warnings[0].mentions("reasoning.max_tokens"));
}

#[test]
fn test_unknown_model_fails_closed() {
    let cfg = GenerationConfig {
        sampling: Some(SamplingConfig {
            temperature: Some(1.0),
            ..Default::default()
        }),
        length: Some(LengthConfig {
            max_tokens: Some(256),
            ..Default::default()
        }),
        reasoning: Some(ReasoningConfig {
            effort: Some(Effort::Low),
            ..Default::default()
        }),
    };
    let out = encode_request("vendor/new-model", None, &cfg);
    assert!(out.request_fragment.is_empty());
    assert!(out.is_ignored("temperature"));
    assert!(out.is_ignored("max_tokens"));
    assert_eq!(out.warnings_of(WarningKind::Unsupported).count(), 1);
}

#[test]
fn test_fragment_keys_backed_by_capability_flags() {
    let mut cap = capability(ReasoningClass::B, None);
    cap.length.verbosity = true;
    let cfg = GenerationConfig {
        sampling: Some(SamplingConfig {
            temperature: Some(1.0),
            top_a: Some(0.2),
            ..Default::default()
        }),
        length: Some(LengthConfig {
            max_tokens: Some(512),
            verbosity: Some("high".into()),
            ..Default::default()
        }),
        reasoning: Some(ReasoningConfig {
            control_mode: Some(ControlMode::Effort),
            effort: Some(Effort::Minimal),
            show_reasoning_content: Some(true),
            ..Default::default()
        }),
    };
    let out = encode_request("vendor/model", Some(&cap), &cfg);
    assert_eq!(
        out.request_fragment.to_value(),
        json!({
            "temperature": 1.0,
            "max_tokens": 512,
            "verbosity": "high",
            "reasoning": {"effort": "minimal", "exclude": false},
            "include_reasoning": true
        })
    );
    assert!(out.is_ignored("top_a"));
}

#[test]
fn test_policy_threshold_is_tunable() {
    let mut cap = capability(ReasoningClass::C, None);
    cap.sampling.top_k = true;
    let cfg = GenerationConfig {
        sampling: Some(SamplingConfig {
            temperature: Some(0.8),
            top_p: Some(0.9),
            top_k: Some(20),
            ..Default::default()
        }),
        ..Default::default()
    };
    let strict = encode_request("vendor/model", Some(&cap), &cfg);
    assert_eq!(strict.warnings_of(WarningKind::Fallback).count(), 1);

    let policy = AdapterPolicy::default().with_max_concurrent_samplers(3);
    let relaxed = RequestEncoder::with_policy(policy).encode("vendor/model", Some(&cap), &cfg);
    assert_eq!(relaxed.warnings_of(WarningKind::Fallback).count(), 0);
    assert_eq!(relaxed.request_fragment.top_k, Some(20));
}

#[test]
fn test_overrides_merge_over_defaults_before_encoding() {
    let defaults = GenerationConfig::from_yaml_str(
        r#"
sampling:
  temperature: 0.3
  seed: 1
length:
  max_tokens: 2048
"#,
    )
    .unwrap();
    let overrides =
        GenerationConfig::from_json_str(r#"{"sampling": {"temperature": 1.2}}"#).unwrap();
    let effective = resolve_config(&overrides, &defaults);

    let cap = capability(ReasoningClass::C, None);
    let out = encode_request("vendor/model", Some(&cap), &effective);
    assert_eq!(
        out.request_fragment.to_value(),
        json!({"temperature": 1.2, "seed": 1, "max_tokens": 2048})
    );
}
