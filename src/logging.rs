//! File-backed `tracing` setup. The terminal belongs to the dispatch board,
//! so log lines go to `~/.dispatch-manager/dispatch.log` instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Install the global subscriber, appending to the log file inside
/// `data_dir`. `filter` uses `EnvFilter` directive syntax.
pub fn init(data_dir: &Path, filter: &str) -> Result<PathBuf> {
    fs::create_dir_all(data_dir).context("failed to create data directory")?;
    let log_path = data_dir.join(AppConfig::LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter `{filter}`"))?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    tracing::info!(path = %log_path.display(), "logging initialized");
    Ok(log_path)
}
