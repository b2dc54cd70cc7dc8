// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Sends tracing output to `log_path`. The terminal belongs to the TUI, so
/// nothing is ever written to stdout or stderr.
pub fn init(log_path: &Path, default_level: &str) -> Result<()> {
    if let Some(parent) = log_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init()
        .map_err(|error| anyhow::anyhow!("install log subscriber: {error}"))?;
    Ok(())
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[cfg(test)]
mod tests {
    use super::env_filter;
    use crate::test_support::env_lock;

    #[test]
    fn rust_log_overrides_configured_level() {
        let _guard = env_lock();
        // SAFETY: env mutation is serialized by env_lock.
        unsafe {
            std::env::remove_var("RUST_LOG");
        }
        let fallback = env_filter("debug").to_string();

        // SAFETY: env mutation is serialized by env_lock.
        unsafe {
            std::env::set_var("RUST_LOG", "warn");
        }
        let overridden = env_filter("debug").to_string();
        // SAFETY: env mutation is serialized by env_lock.
        unsafe {
            std::env::remove_var("RUST_LOG");
        }

        assert_eq!(fallback, "debug");
        assert_eq!(overridden, "warn");
    }
}
