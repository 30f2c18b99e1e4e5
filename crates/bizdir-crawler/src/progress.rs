use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use url::Url;

/// Progress reporting for a running crawl.
///
/// Every hook has a no-op default, frontends override what they display.
pub trait Progress {
    /// Called once with the number of listing pages that may be visited.
    fn begin(&mut self, _total_pages: usize) {}

    /// Called before a listing page is downloaded.
    fn page(&mut self, _url: &Url, _page: u32) {}

    /// Called after every extracted record.
    fn update(&mut self, _scraped: usize, _estimated: usize) {}

    /// Called at the end, successful or not.
    fn finish(&mut self, _scraped: usize) {}
}

/// A no-op progress sink.
pub struct NullProgress;

impl Progress for NullProgress {}

/// Reports progress through the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress {
    total_pages: usize,
    visited_pages: usize,
}

impl Progress for LogProgress {
    fn begin(&mut self, total_pages: usize) {
        self.total_pages = total_pages;
    }

    fn page(&mut self, url: &Url, page: u32) {
        self.visited_pages += 1;
        log::info!(
            "Visiting page {page} ({}/{}): {url}",
            self.visited_pages,
            self.total_pages
        );
    }

    fn update(&mut self, scraped: usize, estimated: usize) {
        log::debug!(
            "Scraped {scraped} of ~{estimated} businesses ({:.0}%)",
            ratio(scraped, estimated) * 100.
        );
    }

    fn finish(&mut self, scraped: usize) {
        log::info!("Scraped {scraped} businesses");
    }
}

/// Completion ratio in `[0, 1]`, safe against a zero estimate.
pub fn ratio(scraped: usize, estimated: usize) -> f64 {
    (scraped as f64 / estimated.max(1) as f64).min(1.)
}

/// Running estimate of the total number of records a crawl will yield.
#[derive(Debug, Default, Clone)]
pub(crate) struct Estimator {
    listing_pages: usize,
    links_seen: usize,
}

impl Estimator {
    pub(crate) fn listing(&mut self, links: usize) {
        self.listing_pages += 1;
        self.links_seen += links;
    }

    /// `scraped + pending + remaining_pages * average links per listing page`
    pub(crate) fn estimate(&self, scraped: usize, pending: usize, remaining_pages: usize) -> usize {
        let per_page = if self.listing_pages == 0 {
            0.
        } else {
            self.links_seen as f64 / self.listing_pages as f64
        };
        let ahead = (remaining_pages as f64 * per_page).round() as usize;
        scraped + pending + ahead
    }
}

/// Cooperative cancellation flag shared between a crawl and its frontend.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
