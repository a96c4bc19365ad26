use crate::domain::model::{BatchOutcome, Offer, OFFER_COLUMNS};
use crate::domain::ports::OfferSink;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const CSV_FILENAME: &str = "offers.csv";

/// Writes offers to `<output_dir>/offers.csv`, one row per offer, in the
/// same column order as the `sku` table.
pub struct CsvSink {
    path: PathBuf,
    writer: Mutex<Option<csv::Writer<File>>>,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            path: output_dir.as_ref().join(CSV_FILENAME),
            writer: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<csv::Writer<File>>>> {
        self.writer.lock().map_err(|_| EtlError::ProcessingError {
            message: "CSV writer lock poisoned".to_string(),
        })
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn offer_record(offer: &Offer) -> Vec<String> {
    vec![
        offer.uuid.to_string(),
        number(offer.marketplace_id),
        number(offer.product_id),
        text(&offer.title),
        text(&offer.description),
        text(&offer.brand),
        number(offer.seller_id),
        text(&offer.seller_name),
        text(&offer.first_image_url),
        number(offer.category_id),
        text(&offer.category_lvl_1),
        text(&offer.category_lvl_2),
        text(&offer.category_lvl_3),
        text(&offer.category_remaining),
        offer.features.to_string(),
        number(offer.rating_count),
        number(offer.rating_value),
        number(offer.price_before_discounts),
        number(offer.discount),
        number(offer.price_after_discounts),
        number(offer.bonuses),
        number(offer.sales),
        text(&offer.currency),
        number(offer.barcode),
    ]
}

#[async_trait]
impl OfferSink for CsvSink {
    async fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(OFFER_COLUMNS)?;
        *self.lock()? = Some(writer);
        tracing::debug!("Writing offers to {}", self.path.display());
        Ok(())
    }

    async fn write_batch(&self, offers: &[Offer]) -> Result<BatchOutcome> {
        let mut guard = self.lock()?;
        let writer = guard.as_mut().ok_or_else(|| EtlError::ProcessingError {
            message: "CSV sink used before prepare()".to_string(),
        })?;

        for offer in offers {
            writer.write_record(offer_record(offer))?;
        }

        Ok(BatchOutcome {
            written: offers.len(),
            failed: 0,
        })
    }

    async fn finish(&self) -> Result<String> {
        if let Some(mut writer) = self.lock()?.take() {
            writer.flush()?;
        }
        Ok(self.path.display().to_string())
    }
}
