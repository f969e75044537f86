// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{Context, Result};
use std::env;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use stackwood::config::{load_and_validate_declarations, DeclarationFile, RuntimeBuilder};
use stackwood::errors::ConfigError;
use stackwood::graph::DependencyGraphBuilder;
use stackwood::topology::RealWorldTopology;

const DEFAULT_LOG_FILTER: &str = "info";

fn usage(program: &str) {
    eprintln!("Usage: {} [--plan] <declarations.yaml|declarations.toml>", program);
    eprintln!("       {} [--plan] --builtin", program);
    eprintln!("Example: {} configs/realworld-serverless.yaml", program);
    eprintln!("Example: {} --plan --builtin", program);
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("stackwood");
    let plan_only = args.iter().skip(1).any(|a| a == "--plan");
    let source = args.iter().skip(1).find(|a| a.as_str() != "--plan");

    let file = match source.map(String::as_str) {
        Some("--builtin") => DeclarationFile {
            declarations: RealWorldTopology::default()
                .build()
                .context("building the built-in RealWorld topology")?,
            ..Default::default()
        },
        Some(path) => load_and_validate_declarations(path)
            .with_context(|| format!("loading declarations from {}", path))?,
        None => {
            usage(program);
            std::process::exit(1);
        }
    };

    if plan_only {
        let plan = DependencyGraphBuilder::build(&file.declarations).map_err(ConfigError::Invalid)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let (engine, _provider) = RuntimeBuilder::from_config(&file);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("🛑 Interrupted, no further stacks will be started");
            on_interrupt.cancel();
        }
    });

    let started = Instant::now();
    let result = engine
        .run(&file.declarations, cancel)
        .await
        .map_err(ConfigError::Invalid)?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    eprintln!("⏱️  Provisioning time: {:?}", started.elapsed());
    eprintln!("✅ Provisioned: {:?}", result.provisioned());
    if !result.is_success() {
        eprintln!("❌ Failed: {:?}", result.failed());
        eprintln!("⏸️  Not attempted: {:?}", result.not_attempted());
        std::process::exit(2);
    }

    Ok(())
}
