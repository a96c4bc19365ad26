use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Separator between the parts of a category's full path.
pub const CATEGORY_PATH_SEP: &str = "/";

/// One `<category>` element as it appears in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCategory {
    pub id: String,
    /// Empty when the element has no `parentId`.
    pub parent_id: String,
    pub name: String,
}

impl RawCategory {
    pub fn new(id: impl Into<String>, parent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            name: name.into(),
        }
    }
}

/// Marketplace category with its resolved ancestry.
///
/// `path` lists the category names from the root ancestor down to this
/// category itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub path: Vec<String>,
}

impl Category {
    pub fn full_path(&self) -> String {
        self.path.join(CATEGORY_PATH_SEP)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    categories: HashMap<String, Category>,
}

impl CategoryTree {
    /// Resolves every category's path by walking `parent_id` links.
    ///
    /// The walk stops at a missing parent or at the first id seen twice, so a
    /// malformed feed with a parent cycle still terminates.
    pub fn build(raw: &HashMap<String, RawCategory>) -> Self {
        let mut categories = HashMap::with_capacity(raw.len());

        for (id, category) in raw {
            let mut path = vec![category.name.clone()];
            let mut visited = HashSet::from([id.as_str()]);
            let mut current = category;

            while let Some(parent) = raw.get(&current.parent_id) {
                if !visited.insert(parent.id.as_str()) {
                    tracing::warn!("Category {} has a parent cycle through {}", id, parent.id);
                    break;
                }
                path.push(parent.name.clone());
                current = parent;
            }
            path.reverse();

            categories.insert(
                id.clone(),
                Category {
                    id: id.clone(),
                    parent_id: category.parent_id.clone(),
                    name: category.name.clone(),
                    path,
                },
            );
        }

        Self { categories }
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// The `level`-th part (1-based) of the category's path.
    pub fn level(&self, id: &str, level: usize) -> Option<&str> {
        let index = level.checked_sub(1)?;
        self.get(id)?.path.get(index).map(String::as_str)
    }

    /// Everything below the third level, joined with [`CATEGORY_PATH_SEP`].
    pub fn remaining(&self, id: &str) -> Option<String> {
        let path = &self.get(id)?.path;
        if path.len() <= 3 {
            return None;
        }
        Some(path[3..].join(CATEGORY_PATH_SEP))
    }
}

impl From<HashMap<String, Category>> for CategoryTree {
    fn from(categories: HashMap<String, Category>) -> Self {
        Self { categories }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferElement {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: Option<String>,
}

/// Direct children of one `<offer>` element, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOffer {
    pub attributes: HashMap<String, String>,
    pub elements: Vec<OfferElement>,
}

impl RawOffer {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Loader-owned columns of `sku`, in insert order. `inserted_at` and
/// `updated_at` are left to the database defaults.
pub const OFFER_COLUMNS: [&str; 24] = [
    "uuid",
    "marketplace_id",
    "product_id",
    "title",
    "description",
    "brand",
    "seller_id",
    "seller_name",
    "first_image_url",
    "category_id",
    "category_lvl_1",
    "category_lvl_2",
    "category_lvl_3",
    "category_remaining",
    "features",
    "rating_count",
    "rating_value",
    "price_before_discounts",
    "discount",
    "price_after_discounts",
    "bonuses",
    "sales",
    "currency",
    "barcode",
];

/// A row of the `sku` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub uuid: Uuid,
    pub marketplace_id: Option<i32>,
    pub product_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub seller_id: Option<i32>,
    pub seller_name: Option<String>,
    pub first_image_url: Option<String>,
    pub category_id: Option<i64>,
    pub category_lvl_1: Option<String>,
    pub category_lvl_2: Option<String>,
    pub category_lvl_3: Option<String>,
    pub category_remaining: Option<String>,
    pub features: serde_json::Value,
    pub rating_count: Option<i32>,
    pub rating_value: Option<f64>,
    pub price_before_discounts: Option<i64>,
    pub discount: Option<f64>,
    pub price_after_discounts: Option<i64>,
    pub bonuses: Option<i32>,
    pub sales: Option<i32>,
    pub currency: Option<String>,
    pub barcode: Option<i64>,
}

impl Offer {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            marketplace_id: None,
            product_id: None,
            title: None,
            description: None,
            brand: None,
            seller_id: None,
            seller_name: None,
            first_image_url: None,
            category_id: None,
            category_lvl_1: None,
            category_lvl_2: None,
            category_lvl_3: None,
            category_remaining: None,
            features: serde_json::Value::Object(serde_json::Map::new()),
            rating_count: None,
            rating_value: None,
            price_before_discounts: None,
            discount: None,
            price_after_discounts: None,
            bonuses: None,
            sales: None,
            currency: None,
            barcode: None,
        }
    }
}

/// Result of handing one batch to a sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub written: usize,
    pub failed: usize,
}
