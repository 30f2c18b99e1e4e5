use anyhow::Context;
use bizdir_crawler::{
    CrawlingContext, Listing, PageLocation, PageSelection, Scrapable, ScrapingContext, Seed, Url,
};
use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::fields::FieldSet;
use crate::jsonld::JsonLdExtractor;
use crate::listing::ListingParser;
use crate::record::BusinessRecord;

pub const DEFAULT_CATEGORY_URL: &str =
    "https://addisbiz.com/business-directory/shopping/house-office-furniture";
pub const DEFAULT_LINK_SELECTOR: &str = "a.name";
pub const DEFAULT_END_MARKER: &str = "No businesses found in this category";
pub const DEFAULT_ENTITY_TYPE: &str = "LocalBusiness";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddisBizConfig {
    #[serde(default = "default_urls")]
    pub urls: Vec<String>,
    #[serde(default)]
    pub pages: PageSelection,
    #[serde(default)]
    pub fields: FieldSet,
    #[serde(default = "default_link_selector")]
    pub link_selector: String,
    #[serde(default = "default_end_marker")]
    pub end_marker: String,
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
}

impl Default for AddisBizConfig {
    fn default() -> Self {
        Self {
            urls: default_urls(),
            pages: PageSelection::default(),
            fields: FieldSet::default(),
            link_selector: default_link_selector(),
            end_marker: default_end_marker(),
            entity_type: default_entity_type(),
        }
    }
}

fn default_urls() -> Vec<String> {
    vec![DEFAULT_CATEGORY_URL.to_string()]
}

fn default_link_selector() -> String {
    DEFAULT_LINK_SELECTOR.to_string()
}

fn default_end_marker() -> String {
    DEFAULT_END_MARKER.to_string()
}

fn default_entity_type() -> String {
    DEFAULT_ENTITY_TYPE.to_string()
}

/// Scrapes AddisBiz-style category listings and their business detail pages.
#[derive(Debug, Clone)]
pub struct AddisBizScraper {
    urls: Vec<Url>,
    pages: PageSelection,
    fields: FieldSet,
    listing: ListingParser,
    jsonld: JsonLdExtractor,
}

impl AddisBizScraper {
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Extracts the business record of a detail page, whatever its location.
    pub fn scrap_page(&self, page: &str, location: &PageLocation) -> Option<BusinessRecord> {
        let doc = Html::parse_document(page);
        self.jsonld
            .find(&doc)
            .map(|entity| BusinessRecord::project(&entity, &self.fields, &location.to_string()))
    }
}

impl Scrapable for AddisBizScraper {
    type Config = AddisBizConfig;
    type Record = BusinessRecord;

    fn new(config: &AddisBizConfig) -> anyhow::Result<Self> {
        let urls = config
            .urls
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
            .map(|u| Url::parse(u).with_context(|| format!("Invalid category URL {u:?}")))
            .collect::<anyhow::Result<Vec<_>>>()?;
        if config.fields.is_empty() {
            anyhow::bail!("No field selected");
        }

        Ok(Self {
            urls,
            pages: config.pages.clone(),
            fields: config.fields.clone(),
            listing: ListingParser::new(&config.link_selector, &config.end_marker)?,
            jsonld: JsonLdExtractor::new(&config.entity_type)?,
        })
    }

    fn seed(&self) -> Seed {
        Seed {
            urls: self.urls.clone(),
            pages: self.pages.clone(),
        }
    }

    fn scrap_listing(&self, page: &str, ctx: &CrawlingContext) -> anyhow::Result<Listing> {
        Ok(self.listing.parse(page, &ctx.url))
    }

    fn scrap_detail(
        &self,
        page: &str,
        ctx: &ScrapingContext,
    ) -> anyhow::Result<Option<BusinessRecord>> {
        Ok(self.scrap_page(page, ctx.location()))
    }
}
