use std::io::prelude::*;
use std::time::Duration;

use anyhow::{anyhow, Context, Error, Result};
use flate2::read::GzDecoder;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use url::Url;

use crate::config::CrawlerConfig;

/// Source of page bodies used by the crawler.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

/// Plain HTTP fetcher with a fixed number of attempts per URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    retries: usize,
    retry_delay: Duration,
    delay: Option<Duration>,
}

enum Failure {
    Transient(Error),
    Permanent(Error),
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .deflate(true)
            .build()
            .context("Couldn't build HTTP client")?;

        Ok(Self {
            client,
            retries: config.retries.max(1),
            retry_delay: config.retry_delay()?,
            delay: config.delay()?,
        })
    }

    async fn download(&self, url: &Url) -> Result<String, Failure> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Failure::Transient(e.into()))?;

        let status = resp.status();
        if !status.is_success() {
            let e = anyhow!("{url} responded with {status}");
            return Err(if is_transient(status) {
                Failure::Transient(e)
            } else {
                Failure::Permanent(e)
            });
        }

        match resp.headers().get(CONTENT_TYPE) {
            Some(c) if c == "application/x-gzip" || c == "application/gzip" => {
                let compressed = resp
                    .bytes()
                    .await
                    .map_err(|e| Failure::Transient(e.into()))?;
                let mut gz = GzDecoder::new(&compressed[..]);
                let mut page = String::new();
                gz.read_to_string(&mut page)
                    .map_err(|e| Failure::Permanent(e.into()))?;
                Ok(page)
            }
            _ => resp.text().await.map_err(|e| Failure::Transient(e.into())),
        }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let mut last_err = None;

        for attempt in 1..=self.retries {
            match self.download(url).await {
                Ok(page) => {
                    if let Some(delay) = self.delay {
                        tokio::time::sleep(delay).await;
                    }
                    return Ok(page);
                }
                Err(Failure::Permanent(e)) => return Err(e),
                Err(Failure::Transient(e)) => {
                    log::debug!("Attempt {attempt}/{} for {url} failed: {e}", self.retries);
                    last_err = Some(e);
                    if attempt < self.retries {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        let e = last_err.unwrap_or_else(|| anyhow!("No attempt made"));
        Err(e.context(format!(
            "Couldn't download {url} after {} attempts",
            self.retries
        )))
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
