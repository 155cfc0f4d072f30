// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use carebook_app::{GridView, YearMonth};
use carebook_store::validation::parse_period;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub data: Data,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            data: Data::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Data {
    pub records_path: Option<String>,
    pub period: Option<String>,
    pub save_edits: Option<bool>,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            records_path: None,
            period: None,
            save_edits: Some(true),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Ui {
    pub compact_width: Option<u16>,
    pub start_view: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            compact_width: Some(carebook_tui::DEFAULT_COMPACT_WIDTH),
            start_view: Some(GridView::MonthlySettlement.as_str().to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Log {
    pub path: Option<String>,
    pub filter: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            path: None,
            filter: Some(DEFAULT_LOG_FILTER.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CAREBOOK_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CAREBOOK_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(carebook_store::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
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
                    "config file {} is not versioned. Add `version = 1` and put values under [data], [ui], and [log]",
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
        if let Some(records_path) = &self.data.records_path {
            carebook_store::validate_records_path(records_path)
                .with_context(|| format!("data.records_path in {}", path.display()))?;
        }

        if let Some(period) = &self.data.period {
            parse_period(period)
                .with_context(|| format!("data.period {period:?} in {}", path.display()))?;
        }

        if let Some(width) = self.ui.compact_width
            && width == 0
        {
            bail!("ui.compact_width in {} must be positive", path.display());
        }

        if let Some(view) = &self.ui.start_view
            && GridView::parse(view).is_none()
        {
            bail!(
                "ui.start_view {view:?} in {} is not one of: settlement, status, urine",
                path.display()
            );
        }

        if let Some(filter) = &self.log.filter {
            EnvFilter::try_new(filter)
                .with_context(|| format!("log.filter {filter:?} in {}", path.display()))?;
        }

        Ok(())
    }

    /// Explicit config wins over `CAREBOOK_RECORDS_PATH`.
    pub fn records_path(&self) -> Option<PathBuf> {
        self.data
            .records_path
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| env::var_os("CAREBOOK_RECORDS_PATH").map(PathBuf::from))
    }

    /// Configured period, or the month containing `today`.
    pub fn period(&self, today: time::Date) -> Result<YearMonth> {
        match &self.data.period {
            Some(raw) => parse_period(raw).with_context(|| format!("data.period {raw:?}")),
            None => Ok(YearMonth::from_date(today)),
        }
    }

    pub fn save_edits(&self) -> bool {
        self.data.save_edits.unwrap_or(true)
    }

    pub fn start_view(&self) -> GridView {
        self.ui
            .start_view
            .as_deref()
            .and_then(GridView::parse)
            .unwrap_or(GridView::MonthlySettlement)
    }

    pub fn compact_width(&self) -> u16 {
        self.ui
            .compact_width
            .unwrap_or(carebook_tui::DEFAULT_COMPACT_WIDTH)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log.path {
            Some(path) => Ok(PathBuf::from(path)),
            None => carebook_store::default_log_path(),
        }
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# carebook config\n# Place this file at: {}\n\nversion = 1\n\n[data]\n# Optional JSON import with \"settlement\", \"status\" and \"urine\" arrays.\n# records_path = \"/absolute/path/to/records.json\"\n# Optional. Defaults to the current month.\n# period = \"2024-09\"\nsave_edits = true\n\n[ui]\ncompact_width = {}\nstart_view = \"settlement\"\n\n[log]\n# Optional. Default is the platform data dir (for example ~/.local/share/carebook/carebook.log)\n# path = \"/absolute/path/to/carebook.log\"\nfilter = \"{}\"\n",
            path.display(),
            carebook_tui::DEFAULT_COMPACT_WIDTH,
            DEFAULT_LOG_FILTER,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use anyhow::Result;
    use carebook_app::{GridView, YearMonth};
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use time::macros::date;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.start_view(), GridView::MonthlySettlement);
        assert_eq!(config.compact_width(), 100);
        assert_eq!(config.log_filter(), "info");
        assert!(config.save_edits());
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[ui]\nstart_view = \"urine\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[data], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[data]\nperiod = \"2024-02\"\nsave_edits = false\n[ui]\ncompact_width = 80\nstart_view = \"status\"\n[log]\nfilter = \"carebook=debug\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.period(date!(2026 - 10 - 18))?, YearMonth::new(2024, 2)?);
        assert_eq!(config.start_view(), GridView::StatusChange);
        assert_eq!(config.compact_width(), 80);
        assert_eq!(config.log_filter(), "carebook=debug");
        assert!(!config.save_edits());
        Ok(())
    }

    #[test]
    fn period_defaults_to_the_current_month() -> Result<()> {
        let config = Config::default();
        assert_eq!(config.period(date!(2026 - 10 - 18))?, YearMonth::new(2026, 10)?);
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
    fn unknown_keys_are_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nshow_dashboard = true\n")?;
        let error = Config::load(&path).expect_err("unknown key should fail");
        assert!(format!("{error:#}").contains("show_dashboard"));
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() -> Result<()> {
        let cases = [
            ("version = 1\n[data]\nperiod = \"2024-13\"\n", "data.period"),
            ("version = 1\n[data]\nrecords_path = \"https://example.com/r.json\"\n", "looks like a URI"),
            ("version = 1\n[ui]\ncompact_width = 0\n", "must be positive"),
            ("version = 1\n[ui]\nstart_view = \"billing\"\n", "settlement, status, urine"),
            ("version = 1\n[log]\nfilter = \"carebook=loud\"\n", "log.filter"),
        ];
        for (content, expected) in cases {
            let (_temp, path) = write_config(content)?;
            let error = Config::load(&path).expect_err("invalid value should fail");
            let message = format!("{error:#}");
            assert!(message.contains(expected), "{content}: {message}");
        }
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("CAREBOOK_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("CAREBOOK_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn records_path_prefers_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[data]\nrecords_path = \"/explicit/records.json\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("CAREBOOK_RECORDS_PATH", "/from/env.json");
        }
        let config = Config::load(&path)?;
        let explicit = config.records_path();
        let fallback = Config::default().records_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("CAREBOOK_RECORDS_PATH");
        }
        assert_eq!(explicit, Some(PathBuf::from("/explicit/records.json")));
        assert_eq!(fallback, Some(PathBuf::from("/from/env.json")));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.start_view(), GridView::MonthlySettlement);
        assert_eq!(config.compact_width(), 100);
        assert!(config.data.records_path.is_none());
        Ok(())
    }
}
