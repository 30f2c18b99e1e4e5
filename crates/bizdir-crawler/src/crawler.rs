use std::pin::pin;

use anyhow::{Error, Result};
use futures::{stream, StreamExt};
use url::Url;

use crate::config::{CrawlerConfig, OnError};
use crate::fetch::{Fetch, HttpFetcher};
use crate::progress::{CancelToken, Estimator, LogProgress, Progress};
use crate::scrapable::{CrawlingContext, Listing, PageLocation, Scrapable, ScrapingContext, Seed};

/// What a crawl produced, possibly cut short by cancellation.
#[derive(Debug, Clone)]
pub struct CrawlOutcome<R> {
    pub records: Vec<R>,
    pub pages_visited: usize,
    pub details_visited: usize,
    pub cancelled: bool,
}

impl<R> Default for CrawlOutcome<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            pages_visited: 0,
            details_visited: 0,
            cancelled: false,
        }
    }
}

fn skip_or_fail(policy: OnError, level: log::Level, what: &str, e: Error) -> Result<()> {
    match policy {
        OnError::SkipAndLog => {
            log::log!(level, "Skipping {what} got: {e:#}");
            Ok(())
        }
        OnError::Fail => Err(e.context(format!("Couldn't process {what}"))),
    }
}

pub async fn crawl_with<T, F, P>(
    crawler_conf: &CrawlerConfig,
    scraper: &T,
    fetcher: &F,
    progress: &mut P,
    cancel: &CancelToken,
) -> Result<CrawlOutcome<T::Record>>
where
    T: Scrapable,
    F: Fetch,
    P: Progress + ?Sized,
{
    let Seed { urls, pages } = scraper.seed();
    let total_pages = urls.len() * pages.len();
    progress.begin(total_pages);

    let mut outcome = CrawlOutcome::default();
    let mut estimator = Estimator::default();
    let mut remaining_pages = total_pages;

    'categories: for base in &urls {
        for (i, &page) in pages.pages().iter().enumerate() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break 'categories;
            }
            remaining_pages -= 1;

            // Listing page

            let url = scraper.listing_url(base, page);
            progress.page(&url, page);

            let listing = match fetcher.fetch(&url).await {
                Ok(listing) => listing,
                Err(e) => {
                    skip_or_fail(crawler_conf.on_dl_error, log::Level::Warn, url.as_str(), e)?;
                    continue;
                }
            };
            outcome.pages_visited += 1;

            let ctx = CrawlingContext {
                url: url.clone(),
                base: base.clone(),
                page,
            };
            let links = match scraper.scrap_listing(&listing, &ctx) {
                Ok(Listing::Links(links)) => links,
                Ok(Listing::End) => {
                    log::info!("Reached end of listings at {url}");
                    remaining_pages -= pages.len() - i - 1;
                    continue 'categories;
                }
                Err(e) => {
                    skip_or_fail(
                        crawler_conf.on_scrap_error,
                        log::Level::Error,
                        url.as_str(),
                        e,
                    )?;
                    continue;
                }
            };
            if links.is_empty() {
                log::warn!("No business link found on {url}");
            }
            estimator.listing(links.len());

            // Detail pages

            let mut pending = links.len();
            let mut downloads = pin!(stream::iter(links)
                .map(move |link| async move {
                    let page = fetcher.fetch(&link).await;
                    (link, page)
                })
                .buffered(crawler_conf.concurrent_downloads()));

            loop {
                if cancel.is_cancelled() {
                    outcome.cancelled = true;
                    break 'categories;
                }
                let Some((link, detail)) = downloads.next().await else {
                    break;
                };
                pending -= 1;
                outcome.details_visited += 1;

                let detail = match detail {
                    Ok(detail) => detail,
                    Err(e) => {
                        skip_or_fail(crawler_conf.on_dl_error, log::Level::Warn, link.as_str(), e)?;
                        continue;
                    }
                };

                let ctx = ScrapingContext::new(PageLocation::Url(link.clone()), url.clone());
                match scraper.scrap_detail(&detail, &ctx) {
                    Ok(Some(record)) => {
                        outcome.records.push(record);
                        let scraped = outcome.records.len();
                        progress.update(
                            scraped,
                            estimator.estimate(scraped, pending, remaining_pages),
                        );
                    }
                    Ok(None) => log::debug!("No business entity found at {link}"),
                    Err(e) => skip_or_fail(
                        crawler_conf.on_scrap_error,
                        log::Level::Error,
                        link.as_str(),
                        e,
                    )?,
                }
            }
        }
    }

    if outcome.cancelled {
        log::warn!("Crawl cancelled");
    }
    progress.finish(outcome.records.len());

    Ok(outcome)
}

/// Crawls over HTTP, logging progress and stopping cleanly on SIGINT.
pub async fn crawl_site<T>(
    crawler_conf: &CrawlerConfig,
    scraper_conf: &T::Config,
) -> Result<CrawlOutcome<T::Record>>
where
    T: Scrapable,
{
    let scraper = T::new(scraper_conf)?;
    let fetcher = HttpFetcher::new(crawler_conf)?;
    let cancel = CancelToken::new();
    let mut progress = LogProgress::default();

    let crawl = crawl_with(crawler_conf, &scraper, &fetcher, &mut progress, &cancel);
    if !crawler_conf.handle_sigint {
        return crawl.await;
    }

    let mut crawl = pin!(crawl);
    tokio::select! {
        res = &mut crawl => res,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, finishing current page");
            cancel.cancel();
            crawl.await
        }
    }
}

/// Downloads and scraps a single detail page.
pub async fn scrap_url<T, F>(scraper: &T, fetcher: &F, url: &Url) -> Result<Option<T::Record>>
where
    T: Scrapable,
    F: Fetch,
{
    let page = fetcher.fetch(url).await?;
    scraper.scrap_detail(&page, &ScrapingContext::with_location(PageLocation::Url(url.clone())))
}
