//! Organizer configuration.
//!
//! The configuration is built once at startup and passed by reference to
//! every component. It can be overridden, fully or partially, by a JSON
//! file:
//!
//! ```json
//! {
//!   "categories": {
//!     "Documents": [".pdf", ".txt"],
//!     "Images": [".png", ".jpg"]
//!   },
//!   "ignore_files": [".ds_store", "thumbs.db"],
//!   "ignore_folders": ["node_modules", ".git"],
//!   "duplicate_strategy": "rename",
//!   "log_file": "dirsort.log",
//!   "log_level": "INFO",
//!   "max_log_size": 5242880,
//!   "backup_count": 3
//! }
//! ```
//!
//! Missing keys keep their built-in defaults and unknown keys are ignored.
//! The order of the `categories` keys is the order in which categories are
//! matched.

use crate::file_category::{CATCH_ALL, Category, CategoryTable};
use crate::ignore::PlatformRules;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

/// Default name of the log file written inside the organized directory.
pub const DEFAULT_LOG_FILE: &str = "dirsort.log";
/// Default size at which the log file is rotated.
pub const DEFAULT_MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Default number of rotated log files kept.
pub const DEFAULT_BACKUP_COUNT: usize = 3;
/// Name of the per-directory config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".dirsort.json";

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    /// The file could not be read or written.
    #[error("I/O error on configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON, or not a JSON object.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    /// A known key has a value of the wrong shape.
    #[error("invalid value for '{key}': {reason}")]
    InvalidField { key: String, reason: String },
    /// `duplicate_strategy` is not one of the recognized values.
    #[error("invalid duplicate_strategy '{0}', must be one of: rename, skip, overwrite")]
    InvalidStrategy(String),
    /// `log_level` is not a recognized level name.
    #[error("invalid log_level '{0}', must be one of: TRACE, DEBUG, INFO, WARNING, ERROR")]
    InvalidLogLevel(String),
}

/// What to do when the destination of a move already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    /// Give the incoming file a new, timestamped name.
    #[default]
    Rename,
    /// Leave the incoming file where it is.
    Skip,
    /// Replace the existing file. Destructive.
    Overwrite,
}

impl DuplicateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateStrategy::Rename => "rename",
            DuplicateStrategy::Skip => "skip",
            DuplicateStrategy::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicateStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rename" => Ok(DuplicateStrategy::Rename),
            "skip" => Ok(DuplicateStrategy::Skip),
            "overwrite" => Ok(DuplicateStrategy::Overwrite),
            other => Err(ConfigError::InvalidStrategy(other.to_string())),
        }
    }
}

/// Settings for the log file written by the command line tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// File name, relative to the organized directory.
    pub file: String,
    pub level: Level,
    /// Size in bytes at which the file is rotated on startup.
    pub max_size: u64,
    /// Number of rotated files kept.
    pub backup_count: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: DEFAULT_LOG_FILE.to_string(),
            level: Level::INFO,
            max_size: DEFAULT_MAX_LOG_SIZE,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }
}

/// Parses a log level name. `WARNING` is accepted as an alias of `WARN`.
pub fn parse_log_level(name: &str) -> Result<Level, ConfigError> {
    match name.to_ascii_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel(name.to_string())),
    }
}

/// Resolved, immutable configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerConfig {
    /// Ordered category table, catch-all included.
    pub categories: CategoryTable,
    /// Lower-case file names that are never organized.
    pub ignore_files: BTreeSet<String>,
    /// Folder names that are never descended into.
    pub ignore_folders: BTreeSet<String>,
    pub duplicate_strategy: DuplicateStrategy,
    pub log: LogSettings,
    /// Not read from the file; always the host's conventions unless overridden in code.
    pub platform: PlatformRules,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            categories: CategoryTable::default(),
            ignore_files: [".ds_store", "thumbs.db", "desktop.ini"]
                .into_iter()
                .map(String::from)
                .collect(),
            ignore_folders: ["organized_files", "node_modules", ".git", "__pycache__"]
                .into_iter()
                .map(String::from)
                .collect(),
            duplicate_strategy: DuplicateStrategy::Rename,
            log: LogSettings::default(),
            platform: PlatformRules::host(),
        }
    }
}

impl OrganizerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.dirsort.json` in the current directory
    /// 3. Look for `~/.config/dirsort/config.json` in the home directory
    /// 4. Fall back to the built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file does not exist, or if
    /// any file that is found cannot be read or fails validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join("config.json");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_json_str(&content)
    }

    /// Parses a JSON override and merges it over the defaults.
    ///
    /// A `categories` object replaces the default table as a whole.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::ConfigInvalid(format!("JSON parse error: {}", e)))?;
        let object = value.as_object().ok_or_else(|| {
            ConfigError::ConfigInvalid("top level must be a JSON object".to_string())
        })?;

        let mut config = Self::default();

        if let Some(categories) = object.get("categories") {
            config.categories = parse_categories(categories)?;
        }
        if let Some(files) = object.get("ignore_files") {
            config.ignore_files = string_list("ignore_files", files)?
                .into_iter()
                .map(|name| name.to_lowercase())
                .collect();
        }
        if let Some(folders) = object.get("ignore_folders") {
            config.ignore_folders = string_list("ignore_folders", folders)?
                .into_iter()
                .collect();
        }
        if let Some(strategy) = object.get("duplicate_strategy") {
            let name = strategy
                .as_str()
                .ok_or_else(|| ConfigError::InvalidStrategy(strategy.to_string()))?;
            config.duplicate_strategy = name.parse()?;
        }
        if let Some(file) = object.get("log_file") {
            config.log.file = file
                .as_str()
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| invalid_field("log_file", "expected a non-empty string"))?
                .to_string();
        }
        if let Some(level) = object.get("log_level") {
            let name = level
                .as_str()
                .ok_or_else(|| ConfigError::InvalidLogLevel(level.to_string()))?;
            config.log.level = parse_log_level(name)?;
        }
        if let Some(size) = object.get("max_log_size") {
            config.log.max_size = size
                .as_u64()
                .ok_or_else(|| invalid_field("max_log_size", "expected a non-negative integer"))?;
        }
        if let Some(count) = object.get("backup_count") {
            config.log.backup_count = count
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| invalid_field("backup_count", "expected a non-negative integer"))?;
        }

        Ok(config)
    }

    /// The configuration as a JSON document in the config file format.
    pub fn to_json_value(&self) -> Value {
        let categories: Map<String, Value> = self
            .categories
            .categories()
            .iter()
            .map(|c| {
                let extensions = c
                    .extensions
                    .iter()
                    .map(|ext| Value::String(format!(".{}", ext)))
                    .collect();
                (c.name.clone(), Value::Array(extensions))
            })
            .collect();

        json!({
            "categories": categories,
            "ignore_files": self.ignore_files.iter().collect::<Vec<_>>(),
            "ignore_folders": self.ignore_folders.iter().collect::<Vec<_>>(),
            "duplicate_strategy": self.duplicate_strategy.as_str(),
            "log_file": self.log.file,
            "log_level": self.log.level.to_string(),
            "max_log_size": self.log.max_size,
            "backup_count": self.log.backup_count,
        })
    }

    /// Writes the built-in defaults to `path`.
    ///
    /// Returns `Ok(false)` without touching anything if the file already exists.
    pub fn write_default(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }

        let json = serde_json::to_string_pretty(&Self::default().to_json_value())
            .map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        fs::write(path, json + "\n").map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(true)
    }
}

fn invalid_field(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidField {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn string_list(key: &str, value: &Value) -> Result<Vec<String>, ConfigError> {
    serde_json::from_value(value.clone()).map_err(|_| invalid_field(key, "expected an array of strings"))
}

/// True if `name` joined to a directory stays directly inside it.
fn is_plain_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == std::ffi::OsStr::new(name)
    )
}

fn parse_categories(value: &Value) -> Result<CategoryTable, ConfigError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid_field("categories", "must be an object of name -> extensions"))?;

    let mut categories = Vec::with_capacity(object.len() + 1);
    for (name, extensions) in object {
        if name.trim().is_empty() {
            return Err(invalid_field("categories", "category names must not be empty"));
        }
        if !is_plain_folder_name(name) {
            return Err(invalid_field(
                "categories",
                &format!("category name {:?} must be a single folder name", name),
            ));
        }
        let extensions = string_list(&format!("categories.{}", name), extensions)?;
        categories.push(Category::new(name.clone(), extensions));
    }

    if !categories.iter().any(|c| c.name == CATCH_ALL) {
        categories.push(Category::new(CATCH_ALL, Vec::<String>::new()));
    }

    Ok(CategoryTable::new(categories))
}
