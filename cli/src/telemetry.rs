//! Tracing subscriber setup, grounded on `mcp-server/src/telemetry.rs`'s
//! env-filter-plus-format-layer shape. Log level/format are ambient process
//! concerns, not part of the persisted config schema (spec §6), so they are
//! plain CLI flags rather than TOML fields.

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

pub fn init_telemetry(level: &str, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("invalid log level")?;

    let registry = Registry::default().with(env_filter);

    match format {
        LogFormat::Pretty => {
            registry.with(fmt::layer().pretty().with_target(true)).init();
        }
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_target(true).flatten_event(true))
                .init();
        }
        LogFormat::Compact => {
            registry.with(fmt::layer().compact().with_target(false)).init();
        }
    }

    Ok(())
}
