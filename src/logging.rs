//! tracing subscriber setup.
//!
//! Scheduled tasks run without a console, so records can also be appended to
//! a plain-text file in the data directory.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn filter(verbosity: u8) -> Result<EnvFilter> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let directive = format!("bgstatus={level}")
        .parse()
        .context("invalid log directive")?;
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(directive))
}

/// Install the global subscriber. `-v` maps to debug, `-vv` to trace.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> Result<()> {
    let filter = filter(verbosity)?;
    let result = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    result.map_err(|err| anyhow!("failed to install logger: {err}"))
}
