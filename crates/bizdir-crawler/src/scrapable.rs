use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::pages::PageSelection;

pub trait Scrapable {
    type Config: Clone;
    type Record;

    fn new(config: &Self::Config) -> anyhow::Result<Self>
    where
        Self: Sized;

    fn seed(&self) -> Seed;

    /// URL of the given listing page for a category.
    fn listing_url(&self, base: &Url, page: u32) -> Url {
        with_page(base, page)
    }

    fn scrap_listing(&self, page: &str, ctx: &CrawlingContext) -> anyhow::Result<Listing>;

    fn scrap_detail(
        &self,
        page: &str,
        ctx: &ScrapingContext,
    ) -> anyhow::Result<Option<Self::Record>>;
}

/// Category URLs to crawl and the listing pages to visit for each of them.
#[derive(Debug, Clone)]
pub struct Seed {
    pub urls: Vec<Url>,
    pub pages: PageSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    /// The page says there are no more results.
    End,
    /// Detail pages linked from the listing, in page order.
    Links(Vec<Url>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLocation {
    Url(Url),
    Path(PathBuf),
}

impl fmt::Display for PageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Where a listing page sits in the crawl.
#[derive(Debug, Clone)]
pub struct CrawlingContext {
    pub url: Url,
    pub base: Url,
    pub page: u32,
}

#[derive(Debug, Clone)]
pub struct ScrapingContext {
    location: PageLocation,
    listing: Option<Url>,
}

impl ScrapingContext {
    pub fn new(location: PageLocation, listing: Url) -> Self {
        Self {
            location,
            listing: Some(listing),
        }
    }

    pub fn with_location(location: PageLocation) -> Self {
        Self {
            location,
            listing: None,
        }
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    /// The listing page the detail page was discovered on, if crawled.
    pub fn listing(&self) -> Option<&Url> {
        self.listing.as_ref()
    }
}

/// Sets the `page` query parameter, keeping any other parameter of `base`.
pub fn with_page(base: &Url, page: u32) -> Url {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parameter_is_appended() {
        let base = Url::parse("https://addisbiz.com/business-directory/shopping/furniture").unwrap();
        assert_eq!(
            with_page(&base, 3).as_str(),
            "https://addisbiz.com/business-directory/shopping/furniture?page=3"
        );
    }

    #[test]
    fn page_parameter_is_replaced() {
        let base = Url::parse("https://example.com/list?sort=name&page=9").unwrap();
        assert_eq!(
            with_page(&base, 2).as_str(),
            "https://example.com/list?sort=name&page=2"
        );
    }

    #[test]
    fn location_display() {
        let url = Url::parse("https://example.com/a").unwrap();
        assert_eq!(PageLocation::Url(url).to_string(), "https://example.com/a");
        assert_eq!(
            PageLocation::Path(PathBuf::from("pages/a.html")).to_string(),
            "pages/a.html"
        );
    }
}
