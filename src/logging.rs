use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Filter from `DOCCHAT_LOG`, or `default` when unset or invalid.
fn env_filter(default: &str) -> EnvFilter {
    match EnvFilter::try_from_env("DOCCHAT_LOG") {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default),
    }
}

/// Log to stderr, for one-shot CLI commands.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Log to a file, for the terminal UI which owns the screen.
pub fn init_file() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("docchat");
    fs::create_dir_all(&dir)?;

    let path = dir.join("docchat.log");
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(path)
}
