//! Loads offers into the `sku` table.

use crate::config::database::DatabaseConfig;
use crate::domain::model::{BatchOutcome, Offer};
use crate::domain::ports::OfferSink;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Schema shipped with the compose setup; also runnable via `--init-schema`.
pub const SCHEMA_SQL: &str = include_str!("../../data/init.sql");

const INSERT_OFFER_SQL: &str = r#"
    INSERT INTO sku (
        uuid, marketplace_id, product_id, title, description,
        brand, seller_id, seller_name, first_image_url, category_id,
        category_lvl_1, category_lvl_2, category_lvl_3, category_remaining,
        features, rating_count, rating_value, price_before_discounts,
        discount, price_after_discounts, bonuses, sales, currency, barcode
    )
    VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
        $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
        $21, $22, $23, $24
    )"#;

/// Opens a pool, retrying while the database is still starting up.
///
/// Uses the same budget as the compose health check: `connect_retries`
/// attempts, `retry_interval_secs` apart.
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = with_retries(config.connect_retries, config.retry_interval(), || {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(config.connect_options())
    })
    .await?;

    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.db,
        "🐘 Database connection pool created"
    );
    Ok(pool)
}

async fn with_retries<T, F, Fut>(
    attempts: u32,
    interval: Duration,
    mut connect: F,
) -> std::result::Result<T, sqlx::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "Database not ready (attempt {}/{}): {}; retrying in {:?}",
                    attempt,
                    attempts,
                    e,
                    interval
                );
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("❌ Database unreachable after {} attempts", attempts);
                return Err(e);
            }
        }
    }
}

/// Errors that mean the database itself is gone, as opposed to one row
/// being rejected.
fn is_connection_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

pub async fn init_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    tracing::info!("🧱 sku schema is in place");
    Ok(())
}

fn insert_offer(offer: &Offer) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(INSERT_OFFER_SQL)
        .bind(offer.uuid)
        .bind(offer.marketplace_id)
        .bind(offer.product_id)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(&offer.brand)
        .bind(offer.seller_id)
        .bind(&offer.seller_name)
        .bind(&offer.first_image_url)
        .bind(offer.category_id)
        .bind(&offer.category_lvl_1)
        .bind(&offer.category_lvl_2)
        .bind(&offer.category_lvl_3)
        .bind(&offer.category_remaining)
        .bind(&offer.features)
        .bind(offer.rating_count)
        .bind(offer.rating_value)
        .bind(offer.price_before_discounts)
        .bind(offer.discount)
        .bind(offer.price_after_discounts)
        .bind(offer.bonuses)
        .bind(offer.sales)
        .bind(&offer.currency)
        .bind(offer.barcode)
}

pub struct PostgresSink {
    pool: PgPool,
    written: AtomicUsize,
}

impl PostgresSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            written: AtomicUsize::new(0),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_all(&self, offers: &[Offer]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for offer in offers {
            insert_offer(offer).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Row-by-row fallback so one bad offer does not sink its whole batch.
    /// Losing the connection aborts instead of counting every row as failed.
    async fn insert_each(&self, offers: &[Offer]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for offer in offers {
            match insert_offer(offer).execute(&self.pool).await {
                Ok(_) => outcome.written += 1,
                Err(e) if is_connection_error(&e) => return Err(e.into()),
                Err(e) => {
                    tracing::error!(
                        "❌ Failed to insert offer {:?} ({}): {}",
                        offer.product_id,
                        offer.uuid,
                        e
                    );
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}

#[async_trait]
impl OfferSink for PostgresSink {
    async fn prepare(&self) -> Result<()> {
        sqlx::query("SELECT 1 FROM sku LIMIT 1")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_batch(&self, offers: &[Offer]) -> Result<BatchOutcome> {
        let outcome = match self.insert_all(offers).await {
            Ok(()) => BatchOutcome {
                written: offers.len(),
                failed: 0,
            },
            Err(EtlError::DatabaseError(e)) if is_connection_error(&e) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(
                    "Batch of {} offers rolled back ({}), retrying one by one",
                    offers.len(),
                    e
                );
                self.insert_each(offers).await?
            }
        };

        self.written.fetch_add(outcome.written, Ordering::Relaxed);
        Ok(outcome)
    }

    async fn finish(&self) -> Result<String> {
        let written = self.written.load(Ordering::Relaxed);
        self.pool.close().await;
        Ok(format!("postgres table sku ({} rows inserted)", written))
    }
}
