mod addisbiz;
mod fields;
pub mod jsonld;
mod listing;
mod record;
pub mod writer;

pub use crate::addisbiz::{
    AddisBizConfig, AddisBizScraper, DEFAULT_CATEGORY_URL, DEFAULT_END_MARKER,
    DEFAULT_ENTITY_TYPE, DEFAULT_LINK_SELECTOR,
};
pub use crate::fields::{Field, FieldSet};
pub use crate::listing::ListingParser;
pub use crate::record::BusinessRecord;
pub use crate::writer::{CsvWriterConfig, FileMode, RecordWriter};

pub use anyhow;
