use crate::config::{LogFormat, SinkKind};
use crate::utils::error::Result;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// Optional run file passed with `--config`. Every section and key may be
/// omitted; `${VAR}` references are replaced from the environment.
///
/// ```toml
/// [source]
/// data_dir = "./data"
/// target_filename = "${TARGET_FILENAME}"
///
/// [load]
/// sink = "postgres"
/// batch_size = 500
/// marketplace_id = 1
///
/// [monitoring]
/// enabled = true
/// log_format = "json"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub data_dir: Option<String>,
    pub target_filename: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    pub sink: Option<SinkKind>,
    pub output_path: Option<String>,
    pub batch_size: Option<usize>,
    pub marketplace_id: Option<i32>,
    pub max_offers: Option<usize>,
    pub init_schema: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_format: Option<LogFormat>,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&processed)?)
    }
}

/// Replaces `${VAR}` with the looked-up value. Unknown variables are left
/// untouched so validation can report them.
pub fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_var_pattern()
        .replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            lookup(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
