use crate::core::category::load_category_tree;
use crate::core::feed::FeedReader;
use crate::core::offer::OfferMapper;
use crate::domain::model::{CategoryTree, Offer};
use crate::domain::ports::{ConfigProvider, OfferSink};
use crate::utils::error::{EtlError, Result};
use crate::utils::monitor::ProgressMonitor;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 4;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub feed_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub categories: usize,
    pub offers_seen: usize,
    pub offers_written: usize,
    pub offers_failed: usize,
    pub destination: String,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Every offer read from the feed reached the sink.
    pub fn is_complete(&self) -> bool {
        self.offers_failed == 0
    }
}

struct OfferBatch {
    offers: Vec<Offer>,
    position: u64,
}

pub struct EtlEngine<S: OfferSink> {
    sink: S,
    mapper: OfferMapper,
    batch_size: usize,
    max_offers: Option<usize>,
    monitor_enabled: bool,
}

impl<S: OfferSink> EtlEngine<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            mapper: OfferMapper::default(),
            batch_size: 500,
            max_offers: None,
            monitor_enabled: false,
        }
    }

    pub fn from_config<C: ConfigProvider>(sink: S, config: &C) -> Self {
        Self::new(sink)
            .with_batch_size(config.batch_size())
            .with_marketplace_id(config.marketplace_id())
            .with_max_offers(config.max_offers())
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_marketplace_id(mut self, marketplace_id: Option<i32>) -> Self {
        self.mapper = OfferMapper::new(marketplace_id);
        self
    }

    pub fn with_max_offers(mut self, max_offers: Option<usize>) -> Self {
        self.max_offers = max_offers;
        self
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor_enabled = enabled;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub async fn run(&self, feed_path: &Path) -> Result<RunSummary> {
        let started_at = Utc::now();
        let started = Instant::now();
        let total_bytes = tokio::fs::metadata(feed_path).await?.len();
        tracing::info!("📁 Feed: {} ({} bytes)", feed_path.display(), total_bytes);

        let mut monitor = ProgressMonitor::new(total_bytes, self.monitor_enabled);

        // Pass 1: categories
        let path = feed_path.to_path_buf();
        let tree = tokio::task::spawn_blocking(move || load_category_tree(path))
            .await
            .map_err(|e| EtlError::ProcessingError {
                message: format!("Category pass panicked: {}", e),
            })??;
        tracing::info!("🗂️ Loaded {} categories", tree.len());
        monitor.log_stats("categories");

        // Pass 2: offers
        self.sink.prepare().await?;

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let producer = {
            let path = feed_path.to_path_buf();
            let mapper = self.mapper.clone();
            let batch_size = self.batch_size;
            let max_offers = self.max_offers;
            tokio::task::spawn_blocking(move || {
                produce_batches(&path, &tree, &mapper, batch_size, max_offers, &tx);
                tree.len()
            })
        };

        let mut offers_seen = 0usize;
        let mut offers_written = 0usize;
        let mut offers_failed = 0usize;

        while let Some(message) = rx.recv().await {
            let batch: OfferBatch = message?;
            offers_seen += batch.offers.len();

            let outcome = self.sink.write_batch(&batch.offers).await?;
            offers_written += outcome.written;
            offers_failed += outcome.failed;
            if outcome.failed > 0 {
                tracing::warn!("⚠️ {} offers in batch were not written", outcome.failed);
            }

            monitor.update(batch.position, batch.offers.len() as u64);
        }

        let categories = producer.await.map_err(|e| EtlError::ProcessingError {
            message: format!("Offer pass panicked: {}", e),
        })?;

        let destination = self.sink.finish().await?;
        monitor.log_final_stats();

        Ok(RunSummary {
            feed_path: feed_path.to_path_buf(),
            started_at,
            categories,
            offers_seen,
            offers_written,
            offers_failed,
            destination,
            elapsed: started.elapsed(),
        })
    }
}

/// Blocking side of the offer pass. Errors are forwarded to the receiver,
/// which aborts the run; a closed receiver stops reading.
fn produce_batches(
    path: &Path,
    tree: &CategoryTree,
    mapper: &OfferMapper,
    batch_size: usize,
    max_offers: Option<usize>,
    tx: &mpsc::Sender<Result<OfferBatch>>,
) {
    let mut feed = match FeedReader::open(path) {
        Ok(feed) => feed,
        Err(e) => {
            let _ = tx.blocking_send(Err(e));
            return;
        }
    };

    let mut offers = Vec::with_capacity(batch_size);
    let mut produced = 0usize;

    loop {
        if max_offers.is_some_and(|max| produced >= max) {
            tracing::info!("Reached offer limit of {}", produced);
            break;
        }

        match feed.next_offer() {
            Ok(Some(raw)) => {
                offers.push(mapper.map(&raw, tree));
                produced += 1;
                if offers.len() >= batch_size {
                    let batch = OfferBatch {
                        offers: std::mem::replace(&mut offers, Vec::with_capacity(batch_size)),
                        position: feed.position(),
                    };
                    if tx.blocking_send(Ok(batch)).is_err() {
                        return;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                return;
            }
        }
    }

    if !offers.is_empty() {
        let _ = tx.blocking_send(Ok(OfferBatch {
            offers,
            position: feed.position(),
        }));
    }
}
