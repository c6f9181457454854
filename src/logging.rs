use anyhow::{anyhow, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

/// Directory holding `ragchat.log`.
pub fn log_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine local data directory"))?;
    Ok(data_dir.join("ragchat").join("logs"))
}

/// Route `tracing` output to the log file. The terminal belongs to the UI,
/// so nothing is written to stdout or stderr.
///
/// `RUST_LOG` wins over `level`; both fall back to [`DEFAULT_FILTER`].
pub fn init(level: Option<&str>) -> Result<PathBuf> {
    let dir = log_dir()?;
    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow!("Cannot create log directory {}: {}", dir.display(), e))?;

    let path = dir.join("ragchat.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| anyhow!("Cannot open log file {}: {}", path.display(), e))?;

    let filter = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| level.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
        .try_init()?;

    Ok(path)
}
