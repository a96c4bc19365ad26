pub mod category;
pub mod etl;
pub mod feed;
pub mod offer;

pub use crate::domain::model::{Category, CategoryTree, Offer, RawCategory, RawOffer};
pub use crate::domain::ports::{ConfigProvider, OfferSink};
pub use crate::utils::error::Result;
