mod config;
mod crawler;
mod fetch;
mod pages;
mod progress;
mod scrapable;

pub use config::{CrawlerConfig, OnError, Throttle};
pub use crawler::{crawl_site, crawl_with, scrap_url, CrawlOutcome};
pub use fetch::{Fetch, HttpFetcher};
pub use pages::{PageSelection, MAX_PAGE};
pub use progress::{ratio, CancelToken, LogProgress, NullProgress, Progress};
pub use scrapable::{
    with_page, CrawlingContext, Listing, PageLocation, Scrapable, ScrapingContext, Seed,
};

pub use anyhow;
pub use url::Url;
