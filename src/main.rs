use clap::Parser;
use offer_feed_etl::adapters::postgres::{connect_with_retry, init_schema};
use offer_feed_etl::config::LogFormat;
use offer_feed_etl::core::ConfigProvider;
use offer_feed_etl::domain::ports::OfferSink;
use offer_feed_etl::utils::error::ErrorSeverity;
use offer_feed_etl::utils::{logger, validation::Validate};
use offer_feed_etl::{
    CliConfig, CsvSink, DatabaseConfig, DiscardSink, EtlEngine, PostgresSink, Result, RunSummary,
    Settings, SinkKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine: compose injects the same variables directly.
    let dotenv = dotenvy::dotenv();

    let cli = CliConfig::parse();
    let settings = match cli.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    match settings.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("🚀 Starting offer-etl");
    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) => tracing::debug!("No .env loaded: {}", e),
    }
    tracing::debug!("Settings: {:?}", settings);

    if let Err(e) = settings.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if settings.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&settings).await {
        Ok(summary) => {
            tracing::info!(
                "✅ Loaded {} of {} offers ({} failed, {} categories) in {:?}",
                summary.offers_written,
                summary.offers_seen,
                summary.offers_failed,
                summary.categories,
                summary.elapsed
            );
            tracing::info!(
                "📁 Output: {} (run started {})",
                summary.destination,
                summary.started_at.to_rfc3339()
            );
            if !summary.is_complete() {
                tracing::warn!(
                    "⚠️ {} offers were not written; see the errors above",
                    summary.offers_failed
                );
                eprintln!(
                    "⚠️ ETL process finished with {} of {} offers not written",
                    summary.offers_failed, summary.offers_seen
                );
                std::process::exit(ErrorSeverity::Medium.exit_code());
            }
            println!("✅ ETL process completed successfully!");
            println!("📁 Output: {}", summary.destination);
        }
        Err(e) => {
            tracing::error!(
                "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}

async fn run(settings: &Settings) -> Result<RunSummary> {
    match settings.sink {
        SinkKind::Postgres => {
            let database = DatabaseConfig::from_env()?;
            tracing::debug!("Database: {:?}", database);
            let pool = connect_with_retry(&database).await?;
            if settings.init_schema {
                init_schema(&pool).await?;
            }
            run_with(PostgresSink::new(pool), settings).await
        }
        SinkKind::Csv => run_with(CsvSink::new(&settings.output_path), settings).await,
        SinkKind::Discard => {
            tracing::info!("🔍 DRY RUN MODE - offers are parsed but not stored");
            run_with(DiscardSink::new(), settings).await
        }
    }
}

async fn run_with<S: OfferSink>(sink: S, settings: &Settings) -> Result<RunSummary> {
    let engine = EtlEngine::from_config(sink, settings).with_monitoring(settings.monitor);
    engine.run(&settings.feed_path()).await
}
