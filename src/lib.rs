pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{CsvSink, DiscardSink, PostgresSink};
pub use config::{DatabaseConfig, Settings, SinkKind};
pub use core::etl::{EtlEngine, RunSummary};
pub use utils::error::{EtlError, Result};
