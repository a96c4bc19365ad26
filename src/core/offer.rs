use crate::domain::model::{CategoryTree, Offer, OfferElement, RawOffer};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Turns raw `<offer>` elements into `sku` rows.
///
/// | feed tag      | column                   |
/// |---------------|--------------------------|
/// | `name`        | `title`                  |
/// | `description` | `description`            |
/// | `vendor`      | `brand`                  |
/// | `picture`     | `first_image_url`        |
/// | `categoryId`  | `category_id`, levels    |
/// | `oldprice`    | `price_before_discounts` |
/// | `price`       | `price_after_discounts`  |
/// | `currencyId`  | `currency`               |
/// | `barcode`     | `barcode`                |
/// | `param`       | `features[name]`         |
#[derive(Debug, Clone, Default)]
pub struct OfferMapper {
    marketplace_id: Option<i32>,
}

impl OfferMapper {
    pub fn new(marketplace_id: Option<i32>) -> Self {
        Self { marketplace_id }
    }

    pub fn map(&self, raw: &RawOffer, tree: &CategoryTree) -> Offer {
        self.map_with_uuid(raw, tree, Uuid::new_v4())
    }

    pub fn map_with_uuid(&self, raw: &RawOffer, tree: &CategoryTree, uuid: Uuid) -> Offer {
        let mut offer = Offer::new(uuid);
        offer.marketplace_id = self.marketplace_id;
        offer.product_id = raw.attribute("id").and_then(|id| parse_integer("id", id));

        let mut features = Map::new();

        for element in &raw.elements {
            let text = element.text.as_deref();
            match element.tag.as_str() {
                "name" => offer.title = text.map(str::to_string),
                "description" => offer.description = text.map(str::to_string),
                "vendor" => offer.brand = text.map(str::to_string),
                "picture" => {
                    if offer.first_image_url.is_none() {
                        offer.first_image_url = text.map(str::to_string);
                    }
                }
                "categoryId" => {
                    if let Some(id) = text {
                        apply_category(&mut offer, id, tree);
                    }
                }
                "oldprice" => {
                    offer.price_before_discounts = text.and_then(|t| parse_price("oldprice", t))
                }
                "price" => offer.price_after_discounts = text.and_then(|t| parse_price("price", t)),
                "currencyId" => offer.currency = text.map(str::to_string),
                "barcode" => {
                    if offer.barcode.is_none() {
                        offer.barcode = text.and_then(|t| parse_integer("barcode", t));
                    }
                }
                "param" => add_feature(&mut features, element),
                _ => {}
            }
        }

        offer.discount = discount_percent(offer.price_before_discounts, offer.price_after_discounts);
        offer.features = Value::Object(features);
        offer
    }
}

fn apply_category(offer: &mut Offer, id: &str, tree: &CategoryTree) {
    offer.category_id = parse_integer("categoryId", id);

    if tree.get(id).is_none() {
        tracing::debug!("Offer {:?} references unknown category {}", offer.product_id, id);
        return;
    }
    offer.category_lvl_1 = tree.level(id, 1).map(str::to_string);
    offer.category_lvl_2 = tree.level(id, 2).map(str::to_string);
    offer.category_lvl_3 = tree.level(id, 3).map(str::to_string);
    offer.category_remaining = tree.remaining(id);
}

fn add_feature(features: &mut Map<String, Value>, element: &OfferElement) {
    match element.attributes.get("name") {
        Some(name) => {
            let value = element
                .text
                .as_ref()
                .map(|t| Value::String(t.clone()))
                .unwrap_or(Value::Null);
            features.insert(name.clone(), value);
        }
        None => tracing::debug!("Skipping <param> without name attribute"),
    }
}

fn parse_integer(field: &str, text: &str) -> Option<i64> {
    let parsed = text.trim().parse::<i64>().ok();
    if parsed.is_none() {
        tracing::debug!("Cannot parse {} value {:?} as integer", field, text);
    }
    parsed
}

/// Prices are stored as whole currency units; fractional prices are rounded.
/// Negative and out-of-range values are treated as unparseable.
fn parse_price(field: &str, text: &str) -> Option<i64> {
    let normalized = text.trim().replace(',', ".");
    let parsed = match normalized.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => normalized
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
            .map(|value| value.round() as i64),
    };

    match parsed {
        Some(value) if value >= 0 => Some(value),
        _ => {
            tracing::debug!("Cannot parse {} value {:?} as price", field, text);
            None
        }
    }
}

fn discount_percent(before: Option<i64>, after: Option<i64>) -> Option<f64> {
    match (before, after) {
        (Some(before), Some(after)) if before > 0 && after < before => {
            let (before, after) = (before as f64, after as f64);
            let percent = (before - after) / before * 100.0;
            Some((percent * 100.0).round() / 100.0)
        }
        _ => None,
    }
}
