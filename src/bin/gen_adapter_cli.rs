//! gen-adapter-cli: 请求编码、流式解码、能力分类的命令行工具
//!
//! Usage:
//!   gen-adapter-cli encode --model <id> [--catalog <file>] [--config <file>]
//!   gen-adapter-cli decode [--model <id>]          Decode SSE lines from stdin
//!   gen-adapter-cli classify [--catalog <file>]    Show reasoning class per model

use anyhow::{bail, Context};
use futures::stream::{self, StreamExt};
use gen_protocol_adapter::stream::StreamEvent;
use gen_protocol_adapter::{
    build_usage_log_payload, decode_lines, encode_request, CapabilityCatalog, CapabilitySource,
    GenerationConfig, UsageLogOptions,
};
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const CATALOG_ENV: &str = "GEN_ADAPTER_CATALOG";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "encode" => cmd_encode(&args[2..]),
        "decode" => cmd_decode(&args[2..]).await,
        "classify" => cmd_classify(&args[2..]),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"gen-adapter-cli: 生成协议适配层命令行工具

USAGE:
    gen-adapter-cli <COMMAND> [OPTIONS]

COMMANDS:
    encode --model <id> [--catalog <file>] [--config <file>]
                                Encode a generation config for one model
    decode [--model <id>]       Decode SSE lines from stdin into JSON events
    classify [--catalog <file>] Show reasoning class and visibility per model
    version                     Show version information
    help                        Show this help message

ENVIRONMENT:
    GEN_ADAPTER_CATALOG         Default capability catalog path (YAML or JSON)
    RUST_LOG                    Log filter (default: warn)"#
    );
}

fn cmd_version() {
    println!(
        "gen-adapter-cli {} (gen-protocol-adapter {})",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_VERSION"),
    );
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn resolve_catalog_path(args: &[String]) -> anyhow::Result<PathBuf> {
    if let Some(path) = flag_value(args, "--catalog") {
        return Ok(PathBuf::from(path));
    }
    if let Ok(path) = std::env::var(CATALOG_ENV) {
        return Ok(PathBuf::from(path));
    }
    bail!("no capability catalog given; use --catalog or set {CATALOG_ENV}")
}

fn load_catalog(args: &[String]) -> anyhow::Result<CapabilityCatalog> {
    let path = resolve_catalog_path(args)?;
    CapabilityCatalog::load_from_file(&path)
        .with_context(|| format!("loading catalog {}", path.display()))
}

fn cmd_encode(args: &[String]) -> anyhow::Result<()> {
    let Some(model) = flag_value(args, "--model") else {
        bail!("encode requires --model <id>");
    };
    let catalog = load_catalog(args)?;
    let config = match flag_value(args, "--config") {
        Some(path) => GenerationConfig::load_from_file(path)
            .with_context(|| format!("loading config {path}"))?,
        None => GenerationConfig::default(),
    };

    let capability = catalog.get_capability(model);
    if capability.is_none() {
        eprintln!("warning: {model} not in catalog, every optional parameter is denied");
    }
    let out = encode_request(model, capability.as_deref(), &config);
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn cmd_decode(args: &[String]) -> anyhow::Result<()> {
    let model = flag_value(args, "--model").unwrap_or("unknown");
    let started = Instant::now();

    let reader = BufReader::new(tokio::io::stdin()).lines();
    let lines = stream::unfold(reader, |mut reader| async move {
        match reader.next_line().await {
            Ok(Some(line)) => Some((line, reader)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                None
            }
        }
    });

    let mut results = decode_lines(lines);
    let mut first_event_ms = None;
    let mut last_usage = None;
    let mut upstream_error = None;
    let mut completed = false;

    while let Some(result) = results.next().await {
        if first_event_ms.is_none() && !result.events.is_empty() {
            first_event_ms = Some(elapsed_ms(started));
        }
        for event in &result.events {
            match event {
                StreamEvent::Usage { raw, .. } => last_usage = Some(raw.clone()),
                StreamEvent::Error { code, message, .. } => {
                    upstream_error = Some(code.clone().unwrap_or_else(|| message.clone()))
                }
                _ => {}
            }
        }
        completed |= result.is_done;
        println!("{}", serde_json::to_string(&result)?);
    }

    let mut options = UsageLogOptions::new(model).with_timing(elapsed_ms(started), first_event_ms);
    if let Some(raw) = last_usage {
        options = options.with_raw_usage(raw);
    }
    if let Some(code) = upstream_error {
        options = options.with_error(code);
    }
    if !completed {
        options = options.aborted();
    }
    let payload = build_usage_log_payload(options);
    println!("{}", serde_json::to_string(&payload)?);
    Ok(())
}

fn cmd_classify(args: &[String]) -> anyhow::Result<()> {
    let catalog = load_catalog(args)?;
    let snapshot = catalog.snapshot();
    println!("{:<48} {:<6} {:<8} {}", "MODEL", "CLASS", "BUDGET", "VISIBLE");
    for id in catalog.model_ids() {
        let Some(cap) = snapshot.get(&id) else {
            continue;
        };
        println!(
            "{:<48} {:<6} {:<8} {}",
            id,
            cap.reasoning_class().to_string(),
            if cap.reasoning.supports_max_reasoning_tokens { "yes" } else { "no" },
            cap.reasoning.returns_visible_reasoning.diagnostic_label(),
        );
    }
    println!("\n{} model(s)", catalog.len());
    Ok(())
}

fn elapsed_ms(since: Instant) -> i64 {
    i64::try_from(since.elapsed().as_millis()).unwrap_or(i64::MAX)
}
