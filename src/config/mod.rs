#[cfg(feature = "cli")]
pub mod cli;
pub mod database;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, validate_range,
    validate_required_field, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use database::DatabaseConfig;
pub use toml_config::TomlConfig;

pub const FEED_EXTENSIONS: [&str; 2] = ["xml", "yml"];
pub const MAX_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Postgres,
    Csv,
    Discard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Fully resolved run settings.
///
/// Built from defaults, then the environment, then a TOML file, then command
/// line flags; each layer only overrides what it sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub target_filename: Option<String>,
    pub sink: SinkKind,
    pub output_path: String,
    pub batch_size: usize,
    pub marketplace_id: Option<i32>,
    pub max_offers: Option<usize>,
    pub monitor: bool,
    pub init_schema: bool,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            target_filename: None,
            sink: SinkKind::default(),
            output_path: "./output".to_string(),
            batch_size: 500,
            marketplace_id: None,
            max_offers: None,
            monitor: false,
            init_schema: false,
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    /// Applies `TARGET_FILENAME` from the given environment lookup.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("TARGET_FILENAME").filter(|n| !n.trim().is_empty()) {
            self.target_filename = Some(name);
        }
        self
    }

    pub fn apply_process_env(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    pub fn apply_toml(mut self, config: &TomlConfig) -> Self {
        let source = &config.source;
        if let Some(dir) = &source.data_dir {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(name) = &source.target_filename {
            self.target_filename = Some(name.clone());
        }

        let load = &config.load;
        if let Some(sink) = load.sink {
            self.sink = sink;
        }
        if let Some(path) = &load.output_path {
            self.output_path = path.clone();
        }
        if let Some(size) = load.batch_size {
            self.batch_size = size;
        }
        if load.marketplace_id.is_some() {
            self.marketplace_id = load.marketplace_id;
        }
        if load.max_offers.is_some() {
            self.max_offers = load.max_offers;
        }
        if let Some(init) = load.init_schema {
            self.init_schema = init;
        }

        if let Some(monitoring) = &config.monitoring {
            self.monitor = monitoring.enabled;
            if let Some(format) = monitoring.log_format {
                self.log_format = format;
            }
        }
        self
    }
}

impl ConfigProvider for Settings {
    fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn target_filename(&self) -> &str {
        self.target_filename.as_deref().unwrap_or_default()
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn marketplace_id(&self) -> Option<i32> {
        self.marketplace_id
    }

    fn max_offers(&self) -> Option<usize> {
        self.max_offers
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_path("data_dir", &self.data_dir.to_string_lossy())?;

        let name = validate_required_field("TARGET_FILENAME", &self.target_filename)?;
        validate_non_empty_string("target_filename", name)?;
        if name.contains("${") {
            return Err(EtlError::InvalidConfigValueError {
                field: "target_filename".to_string(),
                value: name.clone(),
                reason: "Unresolved environment variable".to_string(),
            });
        }
        validate_file_extension("target_filename", name, &FEED_EXTENSIONS)?;

        if self.sink == SinkKind::Csv {
            validate_path("output_path", &self.output_path)?;
        }
        validate_range("batch_size", self.batch_size, 1, MAX_BATCH_SIZE)?;

        if self.max_offers == Some(0) {
            return Err(EtlError::InvalidConfigValueError {
                field: "max_offers".to_string(),
                value: "0".to_string(),
                reason: "Value must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
