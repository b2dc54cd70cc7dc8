// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use civica_activation::RetryPolicy;
use civica_app::PageKind;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "civica";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_RETRY_INTERVAL: &str = "300ms";
const DEFAULT_MAX_RETRIES: i64 = 5;
const DEFAULT_MOUNT_DELAY: &str = "450ms";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub chat: Chat,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            chat: Chat::default(),
            ui: Ui::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub retry_interval: Option<String>,
    pub max_retries: Option<i64>,
    pub mount_delay: Option<String>,
}

impl Default for Chat {
    fn default() -> Self {
        Self {
            retry_interval: Some(DEFAULT_RETRY_INTERVAL.to_owned()),
            max_retries: Some(DEFAULT_MAX_RETRIES),
            mount_delay: Some(DEFAULT_MOUNT_DELAY.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub start_page: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            start_page: Some(PageKind::Home.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub file: Option<String>,
    pub level: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CIVICA_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CIVICA_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [chat], [ui], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(max_retries) = self.chat.max_retries
            && !(0..=i64::from(u32::MAX)).contains(&max_retries)
        {
            bail!(
                "chat.max_retries in {} must be between 0 and {}, got {}",
                path.display(),
                u32::MAX,
                max_retries
            );
        }

        if let Some(interval) = &self.chat.retry_interval {
            parse_duration(interval)
                .with_context(|| format!("chat.retry_interval in {}", path.display()))?;
        }

        if let Some(delay) = &self.chat.mount_delay {
            parse_duration(delay)
                .with_context(|| format!("chat.mount_delay in {}", path.display()))?;
        }

        if let Some(page) = &self.ui.start_page
            && PageKind::parse(page).is_none()
        {
            bail!(
                "ui.start_page in {} must be one of {}, got {:?}",
                path.display(),
                page_names(),
                page
            );
        }

        if let Some(level) = &self.logging.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            bail!(
                "logging.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let interval = parse_duration(
            self.chat
                .retry_interval
                .as_deref()
                .unwrap_or(DEFAULT_RETRY_INTERVAL),
        )?;
        let max_retries = self.chat.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        let max_retries = u32::try_from(max_retries)
            .with_context(|| format!("chat.max_retries out of range: {max_retries}"))?;
        Ok(RetryPolicy::new(interval, max_retries))
    }

    pub fn mount_delay(&self) -> Result<Duration> {
        parse_duration(
            self.chat
                .mount_delay
                .as_deref()
                .unwrap_or(DEFAULT_MOUNT_DELAY),
        )
    }

    pub fn start_page(&self) -> PageKind {
        self.ui
            .start_page
            .as_deref()
            .and_then(PageKind::parse)
            .unwrap_or(PageKind::Home)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.logging.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [logging].file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join("civica.log"))
    }

    pub fn log_level(&self) -> String {
        self.logging
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_ascii_lowercase()
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# civica config\n# Place this file at: {}\n\nversion = 1\n\n[chat]\n# Delay between attempts to reach the chat widget\nretry_interval = \"{}\"\n# Retries after the first attempt\nmax_retries = {}\n# How long the chat widget takes to mount\nmount_delay = \"{}\"\n\n[ui]\n# One of: {}\nstart_page = \"home\"\n\n[logging]\n# Optional. Default is platform data dir (for example ~/.local/share/civica/civica.log)\n# file = \"/absolute/path/to/civica.log\"\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_RETRY_INTERVAL,
            DEFAULT_MAX_RETRIES,
            DEFAULT_MOUNT_DELAY,
            page_names(),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn page_names() -> String {
    PageKind::ALL
        .iter()
        .map(|page| page.as_str())
        .collect::<Vec<&str>>()
        .join(", ")
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins.saturating_mul(60)));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 300ms or 2s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_duration};
    use crate::test_support::env_lock;
    use anyhow::Result;
    use civica_app::PageKind;
    use std::path::PathBuf;
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);

        let policy = config.retry_policy()?;
        assert_eq!(policy.retry_interval, Duration::from_millis(300));
        assert_eq!(policy.max_retries, 5);
        assert_eq!(config.mount_delay()?, Duration::from_millis(450));
        assert_eq!(config.start_page(), PageKind::Home);
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[chat]\nmax_retries = 3\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[chat], [ui], and [logging]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[chat]\nretry_interval = \"1s\"\nmax_retries = 0\nmount_delay = \"0ms\"\n[ui]\nstart_page = \"paa\"\n[logging]\nfile = \"/tmp/civica-test.log\"\nlevel = \"DEBUG\"\n",
        )?;

        let config = Config::load(&path)?;
        let policy = config.retry_policy()?;
        assert_eq!(policy.retry_interval, Duration::from_secs(1));
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.max_probes(), 1);
        assert_eq!(config.mount_delay()?, Duration::ZERO);
        assert_eq!(config.start_page(), PageKind::Paa);
        assert_eq!(config.log_path()?, PathBuf::from("/tmp/civica-test.log"));
        assert_eq!(config.log_level(), "debug");
        Ok(())
    }

    #[test]
    fn partial_chat_section_falls_back_per_field() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[chat]\nmax_retries = 2\n")?;
        let config = Config::load(&path)?;
        let policy = config.retry_policy()?;
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.retry_interval, Duration::from_millis(300));
        assert_eq!(config.mount_delay()?, Duration::from_millis(450));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn negative_max_retries_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[chat]\nmax_retries = -1\n")?;
        let error = Config::load(&path).expect_err("negative retries should fail");
        assert!(error.to_string().contains("chat.max_retries"));
        Ok(())
    }

    #[test]
    fn bad_retry_interval_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[chat]\nretry_interval = \"soon\"\n")?;
        let error = Config::load(&path).expect_err("bad interval should fail");
        let message = format!("{error:#}");
        assert!(message.contains("chat.retry_interval"));
        assert!(message.contains("invalid duration"));
        Ok(())
    }

    #[test]
    fn unknown_start_page_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nstart_page = \"vacinacao\"\n")?;
        let error = Config::load(&path).expect_err("unknown page should fail");
        let message = error.to_string();
        assert!(message.contains("ui.start_page"));
        assert!(message.contains("home, agricultura, pesca, paa, sim"));
        Ok(())
    }

    #[test]
    fn unknown_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[logging]\nlevel = \"loud\"\n")?;
        let error = Config::load(&path).expect_err("unknown level should fail");
        assert!(error.to_string().contains("logging.level"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("CIVICA_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("CIVICA_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("CIVICA_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("civica/config.toml"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("300ms")?, Duration::from_millis(300));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("oops").is_err());
        assert!(parse_duration("-5s").is_err());
        Ok(())
    }

    #[test]
    fn example_config_loads_cleanly() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[chat]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[logging]"));

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.retry_policy()?.max_retries, 5);
        Ok(())
    }
}
