//! Reads a strategy script from stdin, runs it and prints the result.
//!
//! Environment:
//! - `STRATEGY_SANDBOX_*`: engine configuration, see `EngineConfig::from_env`
//! - `STRATEGY_SANDBOXD_SYMBOLS`: comma-separated symbols to load
//! - `STRATEGY_SANDBOXD_PORTFOLIO`: `true` to request portfolio context
//! - `STRATEGY_SANDBOXD_LOG_JSON`: `true` for JSON log lines on stderr

mod offline;

use std::sync::Arc;

use anyhow::{Context, Result};
use strategy_context::InMemoryEntityRegistry;
use strategy_sandbox::{init_tracing, EngineConfig, SandboxEngine, METRICS};
use tokio::io::AsyncReadExt;
use tracing::Level;

use crate::offline::OfflineBroker;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(env_flag("STRATEGY_SANDBOXD_LOG_JSON"), Level::INFO);

    let config = EngineConfig::from_env().context("loading engine configuration")?;
    let broker = Arc::new(OfflineBroker);
    let engine = SandboxEngine::new(
        &config,
        broker.clone(),
        broker,
        Arc::new(InMemoryEntityRegistry::new()),
    )?;

    let mut source = String::new();
    tokio::io::stdin()
        .read_to_string(&mut source)
        .await
        .context("reading script from stdin")?;

    let symbols = std::env::var("STRATEGY_SANDBOXD_SYMBOLS").ok();
    let text = engine
        .execute(
            &source,
            symbols.as_deref(),
            env_flag("STRATEGY_SANDBOXD_PORTFOLIO"),
        )
        .await;
    println!("{text}");

    METRICS.flush();
    Ok(())
}
