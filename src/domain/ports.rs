use crate::domain::model::{BatchOutcome, Offer};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Destination for mapped offers.
#[async_trait]
pub trait OfferSink: Send + Sync {
    /// Called once before the first batch.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    async fn write_batch(&self, offers: &[Offer]) -> Result<BatchOutcome>;

    /// Flushes pending output and describes where the offers ended up.
    async fn finish(&self) -> Result<String>;
}

pub trait ConfigProvider: Send + Sync {
    fn data_dir(&self) -> &Path;
    fn target_filename(&self) -> &str;
    fn batch_size(&self) -> usize;
    fn marketplace_id(&self) -> Option<i32>;
    fn max_offers(&self) -> Option<usize>;

    fn feed_path(&self) -> std::path::PathBuf {
        self.data_dir().join(self.target_filename())
    }
}
