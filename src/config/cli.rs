use crate::config::{LogFormat, Settings, SinkKind, TomlConfig};
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "offer-etl")]
#[command(about = "Loads a marketplace YML/XML offer feed into Postgres")]
pub struct CliConfig {
    /// Optional TOML run file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the feed (default: ./data)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Feed file name inside the data directory (default: $TARGET_FILENAME)
    #[arg(long)]
    pub target_filename: Option<String>,

    /// Where offers go
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,

    /// Output directory for the csv sink (default: ./output)
    #[arg(long)]
    pub output_path: Option<String>,

    /// Offers per insert transaction (default: 500)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Value for the marketplace_id column
    #[arg(long)]
    pub marketplace_id: Option<i32>,

    /// Stop after this many offers
    #[arg(long)]
    pub max_offers: Option<usize>,

    /// Parse and map the feed without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Create the sku table before loading
    #[arg(long)]
    pub init_schema: bool,

    /// Log CPU and memory usage alongside progress
    #[arg(long)]
    pub monitor: bool,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Resolves settings: defaults, environment, `--config` file, then flags.
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = Settings::default().apply_process_env();

        if let Some(path) = &self.config {
            let toml = TomlConfig::from_file(path)?;
            settings = settings.apply_toml(&toml);
        }

        Ok(self.apply_to(settings))
    }

    pub fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
        if let Some(name) = &self.target_filename {
            settings.target_filename = Some(name.clone());
        }
        if let Some(sink) = self.sink {
            settings.sink = sink;
        }
        if let Some(path) = &self.output_path {
            settings.output_path = path.clone();
        }
        if let Some(size) = self.batch_size {
            settings.batch_size = size;
        }
        if self.marketplace_id.is_some() {
            settings.marketplace_id = self.marketplace_id;
        }
        if self.max_offers.is_some() {
            settings.max_offers = self.max_offers;
        }
        if let Some(format) = self.log_format {
            settings.log_format = format;
        }
        settings.monitor |= self.monitor;
        settings.init_schema |= self.init_schema;
        if self.dry_run {
            settings.sink = SinkKind::Discard;
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let cli = CliConfig::parse_from([
            "offer-etl",
            "--target-filename",
            "cli.xml",
            "--sink",
            "csv",
            "--batch-size",
            "10",
            "--monitor",
        ]);
        let base = Settings {
            target_filename: Some("env.xml".to_string()),
            batch_size: 99,
            ..Settings::default()
        };

        let settings = cli.apply_to(base);
        assert_eq!(settings.target_filename.as_deref(), Some("cli.xml"));
        assert_eq!(settings.sink, SinkKind::Csv);
        assert_eq!(settings.batch_size, 10);
        assert!(settings.monitor);
    }

    #[test]
    fn test_unset_flags_keep_settings() {
        let cli = CliConfig::parse_from(["offer-etl"]);
        let base = Settings {
            target_filename: Some("env.xml".to_string()),
            monitor: true,
            ..Settings::default()
        };
        assert_eq!(cli.apply_to(base.clone()), base);
    }

    #[test]
    fn test_dry_run_forces_discard_sink() {
        let cli = CliConfig::parse_from(["offer-etl", "--sink", "csv", "--dry-run"]);
        assert_eq!(cli.apply_to(Settings::default()).sink, SinkKind::Discard);
    }
}
