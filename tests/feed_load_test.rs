use anyhow::Result;
use async_trait::async_trait;
use offer_feed_etl::config::TomlConfig;
use offer_feed_etl::core::ConfigProvider;
use offer_feed_etl::domain::model::{BatchOutcome, Offer};
use offer_feed_etl::domain::ports::OfferSink;
use offer_feed_etl::utils::validation::Validate;
use offer_feed_etl::{CsvSink, DiscardSink, EtlEngine, EtlError, Settings, SinkKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn sample_feed() -> PathBuf {
    fixture_dir().join("sample_feed.xml")
}

#[derive(Clone, Default)]
struct MockSink {
    offers: Arc<Mutex<Vec<Offer>>>,
    fail_product: Option<i64>,
}

impl MockSink {
    fn failing_on(product_id: i64) -> Self {
        Self {
            fail_product: Some(product_id),
            ..Self::default()
        }
    }

    async fn offers(&self) -> Vec<Offer> {
        self.offers.lock().await.clone()
    }
}

#[async_trait]
impl OfferSink for MockSink {
    async fn write_batch(&self, offers: &[Offer]) -> offer_feed_etl::Result<BatchOutcome> {
        let mut stored = self.offers.lock().await;
        let mut outcome = BatchOutcome::default();
        for offer in offers {
            if offer.product_id.is_some() && offer.product_id == self.fail_product {
                outcome.failed += 1;
            } else {
                stored.push(offer.clone());
                outcome.written += 1;
            }
        }
        Ok(outcome)
    }

    async fn finish(&self) -> offer_feed_etl::Result<String> {
        Ok("mock".to_string())
    }
}

fn by_product(offers: &[Offer], product_id: i64) -> &Offer {
    offers
        .iter()
        .find(|o| o.product_id == Some(product_id))
        .unwrap_or_else(|| panic!("offer {} not loaded", product_id))
}

#[tokio::test]
async fn test_sample_feed_end_to_end() -> Result<()> {
    let sink = MockSink::default();
    let engine = EtlEngine::new(sink.clone())
        .with_batch_size(2)
        .with_marketplace_id(Some(1));

    let summary = engine.run(&sample_feed()).await?;

    assert_eq!(summary.categories, 5);
    assert_eq!(summary.offers_seen, 3);
    assert_eq!(summary.offers_written, 3);
    assert_eq!(summary.offers_failed, 0);

    let offers = sink.offers().await;

    let doll = by_product(&offers, 1001);
    assert_eq!(doll.title.as_deref(), Some("Кукла Барби \"Принцесса\""));
    assert_eq!(doll.brand.as_deref(), Some("Mattel"));
    assert_eq!(doll.marketplace_id, Some(1));
    assert_eq!(doll.category_id, Some(4));
    assert_eq!(doll.category_lvl_1.as_deref(), Some("Детям"));
    assert_eq!(doll.category_lvl_2.as_deref(), Some("Девочкам"));
    assert_eq!(doll.category_lvl_3.as_deref(), Some("Куклы"));
    assert_eq!(doll.category_remaining.as_deref(), Some("Барби"));
    assert_eq!(doll.price_before_discounts, Some(2490));
    assert_eq!(doll.price_after_discounts, Some(1990));
    assert_eq!(doll.discount, Some(20.08));
    assert_eq!(doll.first_image_url.as_deref(), Some("https://img.example/1001-1.jpg"));
    assert_eq!(doll.description.as_deref(), Some("<p>Кукла в платье</p>"));
    assert_eq!(doll.barcode, Some(4601234567890));
    assert_eq!(
        doll.features,
        serde_json::json!({"Возраст": "3+", "Цвет": "розовый"})
    );

    let car = by_product(&offers, 1002);
    assert_eq!(car.price_after_discounts, Some(500));
    assert_eq!(car.category_lvl_2.as_deref(), Some("Мальчикам"));
    assert_eq!(car.category_lvl_3, None);
    assert_eq!(car.discount, None);

    let gift = by_product(&offers, 1003);
    assert_eq!(gift.category_id, Some(77));
    assert_eq!(gift.category_lvl_1, None);
    assert_eq!(gift.price_after_discounts, None);

    Ok(())
}

#[tokio::test]
async fn test_failed_rows_are_counted_not_fatal() -> Result<()> {
    let sink = MockSink::failing_on(1002);
    let summary = EtlEngine::new(sink.clone()).run(&sample_feed()).await?;

    assert_eq!(summary.offers_seen, 3);
    assert_eq!(summary.offers_written, 2);
    assert_eq!(summary.offers_failed, 1);
    assert!(!summary.is_complete());
    assert_eq!(sink.offers().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_csv_sink_end_to_end() -> Result<()> {
    let output = TempDir::new()?;
    let engine = EtlEngine::new(CsvSink::new(output.path()));

    let summary = engine.run(&sample_feed()).await?;
    assert!(Path::new(&summary.destination).exists());

    let mut reader = csv::Reader::from_path(&summary.destination)?;
    let titles: Vec<String> = reader
        .records()
        .map(|r| r.map(|record| record[3].to_string()))
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(
        titles,
        vec![
            "Кукла Барби \"Принцесса\"".to_string(),
            "Машинка".to_string(),
            "Подарочный набор".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_settings_from_toml_drive_a_dry_run() -> Result<()> {
    let toml = TomlConfig::from_toml_str(&format!(
        r#"
[source]
data_dir = "{}"
target_filename = "sample_feed.xml"

[load]
sink = "discard"
batch_size = 1
max_offers = 2
"#,
        fixture_dir().to_string_lossy().replace('\\', "/")
    ))?;
    let settings = Settings::default().apply_toml(&toml);
    settings.validate()?;
    assert_eq!(settings.sink, SinkKind::Discard);

    let engine = EtlEngine::from_config(DiscardSink::new(), &settings);
    let summary = engine.run(&settings.feed_path()).await?;

    assert_eq!(summary.offers_seen, 2);
    assert_eq!(engine.sink().seen(), 2);
    assert!(summary.destination.contains("dry run"));
    Ok(())
}

#[tokio::test]
async fn test_malformed_feed_aborts_the_run() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.xml");
    std::fs::write(
        &path,
        "<yml_catalog><shop><categories><category id=\"1\">A</category></categories>\
         <offers><offer id=\"1\"><name>Cut off",
    )?;

    let err = EtlEngine::new(MockSink::default())
        .run(&path)
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::FeedError { .. } | EtlError::XmlError(_)));
    Ok(())
}

#[tokio::test]
async fn test_feed_cut_between_offers_aborts_the_run() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("partial.xml");
    let full = std::fs::read_to_string(sample_feed())?;
    let cut = full.find("</offer>").map(|i| i + "</offer>".len()).unwrap();
    std::fs::write(&path, &full[..cut])?;

    let err = EtlEngine::new(MockSink::default())
        .run(&path)
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::FeedError { .. }));
    Ok(())
}

#[tokio::test]
async fn test_mismatched_tags_are_xml_errors() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("mismatched.xml");
    std::fs::write(&path, "<shop><categories></shop>")?;

    let err = EtlEngine::new(MockSink::default())
        .run(&path)
        .await
        .unwrap_err();
    assert!(matches!(err, EtlError::XmlError(_)));
    Ok(())
}
