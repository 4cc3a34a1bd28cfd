use chrono::{Duration, Local, NaiveDateTime};
use config::{Config, ConfigError, Environment, File as ConfigFile, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::rules::{RenameRuleSpec, RuleSpec};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SaveConfig {
    /// Hours subtracted from the clock before computing today's archive folder.
    #[serde(default)]
    pub archive_time_offset: Option<i64>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RenameConfig {
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RenameRuleSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub work_dir: Option<String>,
    pub archive_dir: String,
    pub db_path: String,
    #[serde(default)]
    pub supported_extensions: Option<Vec<String>>,
    #[serde(default)]
    pub save: SaveConfig,
    #[serde(default)]
    pub rename: RenameConfig,
}

impl AppConfig {
    pub fn from_toml_str(source: &str) -> Result<AppConfig, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(ConfigFile::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config.expand_paths())
    }

    fn expand_paths(mut self) -> Self {
        self.work_dir = self.work_dir.map(|p| expand_home(&p));
        self.archive_dir = expand_home(&self.archive_dir);
        self.db_path = expand_home(&self.db_path);
        self
    }

    /// Work directory from the command line, the config file, or the current directory.
    pub fn resolve_work_dir(&self, explicit: Option<&str>) -> PathBuf {
        explicit
            .map(PathBuf::from)
            .or_else(|| self.work_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load `Config.toml` (or the file named by `MEDIA_ARCHIVE_CONFIG`), then let
/// `MEDIA_ARCHIVE_*` environment variables override top-level keys.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let file_name = env::var("MEDIA_ARCHIVE_CONFIG").unwrap_or_else(|_| "Config".to_string());
    let config: AppConfig = Config::builder()
        .add_source(ConfigFile::with_name(&file_name).required(false))
        .add_source(Environment::with_prefix("MEDIA_ARCHIVE"))
        .build()?
        .try_deserialize()?;
    Ok(config.expand_paths())
}

/// Replace a `$HOME` marker with the user's home directory.
pub fn expand_home(path: &str) -> String {
    match env::var("HOME") {
        Ok(home) if path.contains("$HOME") => path.replace("$HOME", &home),
        _ => path.to_string(),
    }
}

/// Name of the archive folder for `now`: `YYYY-MM-DD`, shifted back by
/// `offset_hours`, with `.N` appended when a split index is given.
pub fn archive_folder_name(now: NaiveDateTime, offset_hours: Option<i64>, split: Option<u32>) -> String {
    let shifted = match offset_hours {
        Some(hours) => now - Duration::hours(hours),
        None => now,
    };
    let date = shifted.format("%Y-%m-%d").to_string();
    match split {
        Some(n) => format!("{}.{}", date, n),
        None => date,
    }
}

pub fn today_archive_folder(offset_hours: Option<i64>, split: Option<u32>) -> String {
    archive_folder_name(Local::now().naive_local(), offset_hours, split)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_archive_folder_name_plain() {
        assert_eq!(archive_folder_name(at(2024, 3, 9, 12), None, None), "2024-03-09");
    }

    #[test]
    fn test_archive_folder_name_offset_crosses_midnight() {
        assert_eq!(archive_folder_name(at(2024, 3, 9, 3), Some(6), None), "2024-03-08");
        assert_eq!(archive_folder_name(at(2024, 3, 9, 7), Some(6), None), "2024-03-09");
    }

    #[test]
    fn test_archive_folder_name_split() {
        assert_eq!(archive_folder_name(at(2024, 3, 9, 12), None, Some(2)), "2024-03-09.2");
    }

    #[test]
    fn test_from_toml_str() {
        let config = AppConfig::from_toml_str(
            r#"
            archive_dir = "/archive"
            db_path = "/archive/data.db"
            supported_extensions = ["jpg", "png"]

            [save]
            archive_time_offset = 6
            [[save.rules]]
            pattern = '^pixiv_(\d+)$'
            source = "pixiv"
            metadata = { "1" = "pid" }

            [rename]
            excludes = ['^pixiv_\d+$']
            [[rename.rules]]
            pattern = '^(\d+)_p\d+$'
            template = "pixiv_{1}"
            "#,
        )
        .unwrap();

        assert_eq!(config.archive_dir, "/archive");
        assert_eq!(config.save.archive_time_offset, Some(6));
        assert_eq!(config.save.rules.len(), 1);
        assert_eq!(config.save.rules[0].group, None);
        assert_eq!(config.save.rules[0].metadata.get("1").unwrap(), "pid");
        assert_eq!(config.rename.rules[0].template, "pixiv_{1}");
        assert_eq!(config.resolve_work_dir(None), PathBuf::from("."));
        assert_eq!(config.resolve_work_dir(Some("/in")), PathBuf::from("/in"));
    }

    #[test]
    fn test_expand_home() {
        let home = env::var("HOME").unwrap_or_default();
        if !home.is_empty() {
            assert_eq!(expand_home("$HOME/pics"), format!("{}/pics", home));
        }
        assert_eq!(expand_home("/abs/path"), "/abs/path");
    }
}
