use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use qd_core::DramaError;
use tracing_subscriber::EnvFilter;

use crate::map_log_file;

pub(crate) const PLAYER_LOG_PATH: &str = ".qriadrama/player.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogTarget {
    Stderr,
    /// Used while the full-screen player owns the terminal.
    File(PathBuf),
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

/// Installs the global subscriber. A second call in the same process keeps the first.
pub(crate) fn init_logging(verbose: bool, target: &LogTarget) -> Result<(), DramaError> {
    let installed = match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(env_filter(verbose))
            .with_writer(std::io::stderr)
            .try_init(),
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter(verbose))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    if installed.is_err() {
        tracing::debug!("logging already initialised");
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File, DramaError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| map_log_file(path, error))?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| map_log_file(path, error))
}
