//! Log subscriber setup.
//!
//! Output goes to stderr so stdout stays parseable, and is optionally
//! duplicated to a file.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted when `--log-level` is not given.
pub const LOG_LEVEL_ENV: &str = "VRDX_LOG_LEVEL";

/// Parse a level name such as `debug` or `WARNING`.
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "error" | "critical" => Some(LevelFilter::ERROR),
        "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// The first level given by flag, environment or config, in that order.
/// An unknown name means `info`.
pub fn effective_level(flag: Option<&str>, env: Option<&str>, config: Option<&str>) -> LevelFilter {
    flag.or(env)
        .or(config)
        .and_then(parse_level)
        .unwrap_or(LevelFilter::INFO)
}

/// Install the global subscriber.
pub fn init(level: LevelFilter, log_file: Option<&Path>) -> Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(level.to_string()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("installing log subscriber")?;
    Ok(())
}
