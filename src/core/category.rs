use crate::core::feed::FeedReader;
use crate::domain::model::{CategoryTree, RawCategory};
use crate::utils::error::Result;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// Indexes raw categories by id. A repeated id replaces the earlier entry.
pub fn index_categories(raw: Vec<RawCategory>) -> HashMap<String, RawCategory> {
    let mut indexed = HashMap::with_capacity(raw.len());
    for category in raw {
        if category.id.is_empty() {
            tracing::debug!("Skipping category without id: {:?}", category.name);
            continue;
        }
        if let Some(previous) = indexed.insert(category.id.clone(), category) {
            tracing::debug!("Category {} defined more than once", previous.id);
        }
    }
    indexed
}

pub fn read_category_tree<R: BufRead>(feed: &mut FeedReader<R>) -> Result<CategoryTree> {
    let raw = feed.read_categories()?;
    Ok(CategoryTree::build(&index_categories(raw)))
}

/// First pass over the feed file: categories only.
pub fn load_category_tree<P: AsRef<Path>>(path: P) -> Result<CategoryTree> {
    let mut feed = FeedReader::open(path)?;
    let tree = read_category_tree(&mut feed)?;
    tracing::debug!("Category pass stopped at byte {}", feed.position());
    Ok(tree)
}
