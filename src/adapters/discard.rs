use crate::domain::model::{BatchOutcome, Offer};
use crate::domain::ports::OfferSink;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts offers and drops them. Used for `--dry-run`.
#[derive(Debug, Default)]
pub struct DiscardSink {
    seen: AtomicUsize,
}

impl DiscardSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OfferSink for DiscardSink {
    async fn write_batch(&self, offers: &[Offer]) -> Result<BatchOutcome> {
        self.seen.fetch_add(offers.len(), Ordering::Relaxed);
        Ok(BatchOutcome {
            written: offers.len(),
            failed: 0,
        })
    }

    async fn finish(&self) -> Result<String> {
        Ok(format!("nowhere (dry run, {} offers parsed)", self.seen()))
    }
}
