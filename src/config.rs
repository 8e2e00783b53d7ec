//! # Configuration Management

//! This module handles the configuration loading and management for the container tracker.
//! It leverages the `config` crate to provide a layered way to define and access configuration settings from various sources, including:

//! * YAML configuration files (default.yaml, development.yaml, production.yaml)
//! * Environment variables

//! The core of this module is the `Settings` struct, which encapsulates all the configuration settings required by the application.

use serde::{Deserialize, Serialize};
use config::{Config, Environment, File};
use std::{env, fmt};
use std::path::PathBuf;
use secrecy::Secret;
use crate::errors::TrackerError;

/// Represents the complete set of configuration settings for the container tracker.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Where the records live
    #[serde(default)]
    pub sheets: SheetsSettings,
    /// Naming and housekeeping of archive sheets
    #[serde(default)]
    pub archive: ArchiveSettings,
    /// Settings for application logging
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Fixed UTC offset of the site, in hours; every timestamp is written in this local time
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset_hours: i32,
    /// The `RUN_MODE` profile the settings were loaded with
    #[serde(skip)]
    pub run_mode: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sheets: SheetsSettings::default(),
            archive: ArchiveSettings::default(),
            logging: LoggingSettings::default(),
            timezone_offset_hours: default_timezone_offset(),
            run_mode: default_run_mode(),
        }
    }
}

/// Which `SheetClient` implementation backs the tracker
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SheetBackend {
    /// The Google Sheets REST API
    #[default]
    Google,
    /// An in-process workbook that lives for one command; nothing it holds is saved
    Memory,
}

/// # Sheets Settings

/// This struct holds the settings required to reach the spreadsheet used as the database
#[derive(Debug, Deserialize, Clone)]
pub struct SheetsSettings {
    /// The backend to use
    #[serde(default)]
    pub backend: SheetBackend,
    /// The spreadsheet identifier (the long id in the spreadsheet URL)
    #[serde(default)]
    pub spreadsheet_id: String,
    /// OAuth2 bearer token for the Sheets API
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub access_token: Option<Secret<String>>,
    /// Root of the Sheets API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// The worksheet holding the active records
    #[serde(default = "default_main_sheet")]
    pub main_sheet: String,
    /// The append-only change-log worksheet
    #[serde(default = "default_log_sheet")]
    pub log_sheet: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            backend: SheetBackend::default(),
            spreadsheet_id: String::new(),
            access_token: None,
            api_base_url: default_api_base_url(),
            main_sheet: default_main_sheet(),
            log_sheet: default_log_sheet(),
        }
    }
}

/// Holds the naming conventions and housekeeping options for archive sheets
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArchiveSettings {
    /// Prefix of daily and monthly archive sheets
    #[serde(default = "default_backup_prefix")]
    pub backup_prefix: String,
    /// Prefix of pre-cutover snapshots
    #[serde(default = "default_snapshot_prefix")]
    pub snapshot_prefix: String,
    /// Take a full snapshot of the active sheet before each cutover
    #[serde(default)]
    pub snapshot_before_cutover: bool,
    /// How many snapshots survive a prune
    #[serde(default = "default_keep_snapshots")]
    pub keep_snapshots: usize,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            backup_prefix: default_backup_prefix(),
            snapshot_prefix: default_snapshot_prefix(),
            snapshot_before_cutover: false,
            keep_snapshots: default_keep_snapshots(),
        }
    }
}

/// Holds the configuration settings for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    /// The logging level (e.g., "info", "debug", "error")
    #[serde(default = "default_log_level")]
    pub level: String,
    /// The directory path where log files will be stored (optional)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), path: None }
    }
}

fn default_timezone_offset() -> i32 { 9 }
fn default_run_mode() -> String { "development".into() }
fn default_api_base_url() -> String { "https://sheets.googleapis.com/".into() }
fn default_main_sheet() -> String { "current_data".into() }
fn default_log_sheet() -> String { "update_log".into() }
fn default_backup_prefix() -> String { "backup_".into() }
fn default_snapshot_prefix() -> String { "tempbackup_".into() }
fn default_keep_snapshots() -> usize { 7 }
fn default_log_level() -> String { "info".into() }

/// # Settings Initialization
///
/// The `Settings` implementation provides a `new` function to load and construct the configuration settings.
impl Settings {
    /// Loads and constructs the application settings from various configuration sources.
    ///
    /// This function reads configuration settings from the following sources, in order of precedence:
    ///
    /// 1. `default.yaml`: Contains default settings for the application
    /// 2. Environment-specific YAML file (e.g., `development.yaml` or `production.yaml`) based on the `RUN_MODE` environment variable
    /// 3. Environment variables prefixed with `APP` (e.g., `APP__SHEETS__ACCESS_TOKEN`)
    ///
    /// The `CONFIG_DIR` environment variable can be used to specify the directory where the YAML configuration files are located (defaults to "config").
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)`: If the settings were loaded and constructed successfully
    /// * `Err(TrackerError)`: If there was an error during the loading or construction process
    pub fn new() -> Result<Self, TrackerError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| default_run_mode());
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "config".into());
        Self::load(&config_dir, &run_mode)
    }

    /// Loads the `run_mode` profile from `config_dir`, with `APP__*` environment overrides on top
    pub fn load(config_dir: &str, run_mode: &str) -> Result<Self, TrackerError> {
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", config_dir)))
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        let mut settings = Self::from_config(s)?;
        settings.run_mode = run_mode.to_string();
        Ok(settings)
    }

    /// Deserializes and normalizes an already-built configuration
    pub fn from_config(config: Config) -> Result<Self, TrackerError> {
        let mut s: Self = config.try_deserialize::<Settings>()
            .map_err(TrackerError::from)?;

        if let Some(ref mut path) = s.logging.path {
            if path.is_relative() {
                *path = env::current_dir()?.join(path.clone());
            }
        }

        s.validate()?;
        Ok(s)
    }

    fn validate(&self) -> Result<(), TrackerError> {
        if self.sheets.main_sheet.is_empty() || self.sheets.log_sheet.is_empty() {
            return Err(TrackerError::ConfigError("sheet names must not be empty".into()));
        }
        if self.archive.backup_prefix.is_empty() || self.archive.snapshot_prefix.is_empty() {
            return Err(TrackerError::ConfigError("archive prefixes must not be empty".into()));
        }
        // "backup_" must not also match the snapshots
        if self.archive.snapshot_prefix.starts_with(&self.archive.backup_prefix) {
            return Err(TrackerError::ConfigError(format!(
                "snapshot prefix {:?} overlaps backup prefix {:?}",
                self.archive.snapshot_prefix, self.archive.backup_prefix
            )));
        }
        if self.archive.snapshot_before_cutover && self.archive.keep_snapshots == 0 {
            return Err(TrackerError::ConfigError(
                "keep_snapshots must be at least 1 when snapshot_before_cutover is set".into()
            ));
        }
        if !(-23..=23).contains(&self.timezone_offset_hours) {
            return Err(TrackerError::ConfigError(format!(
                "timezone_offset_hours must be within -23..=23, got {}",
                self.timezone_offset_hours
            )));
        }
        Ok(())
    }
}

/// Deserializes a secret string from configuration into a `Secret<String>`
fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<Secret<String>>, D::Error>
    where
        D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.filter(|s| !s.is_empty()).map(Secret::new))
}

impl fmt::Display for SheetsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SheetsSettings {{ backend: {:?}, spreadsheet_id: {}, api_base_url: {}, main_sheet: {}, log_sheet: {}, access_token: {} }}",
            self.backend,
            self.spreadsheet_id,
            self.api_base_url,
            self.main_sheet,
            self.log_sheet,
            if self.access_token.is_some() { "[set]" } else { "[unset]" }
        )
    }
}
