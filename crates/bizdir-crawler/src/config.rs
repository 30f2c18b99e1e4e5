use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per request timeout, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Number of attempts for a single download
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Pause between two attempts, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f32,

    #[serde(default = "default_throttle")]
    pub throttle: Option<Throttle>,

    #[serde(default = "default_on_dl_error")]
    pub on_dl_error: OnError,

    #[serde(default = "default_on_scrap_error")]
    pub on_scrap_error: OnError,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            throttle: default_throttle(),
            on_dl_error: default_on_dl_error(),
            on_scrap_error: default_on_scrap_error(),
            handle_sigint: default_handle_sigint(),
        }
    }
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn retry_delay(&self) -> anyhow::Result<Duration> {
        seconds(self.retry_delay.max(0.)).context("Invalid retry delay")
    }

    /// How many detail pages may be downloaded at the same time.
    pub fn concurrent_downloads(&self) -> usize {
        match self.throttle {
            Some(Throttle::Concurrent(n)) => n.get(),
            _ => 1,
        }
    }

    /// Pause after each successful download, if any.
    pub fn delay(&self) -> anyhow::Result<Option<Duration>> {
        match self.throttle {
            Some(Throttle::Delay(secs)) if secs > 0. => {
                seconds(secs).map(Some).context("Invalid throttle delay")
            }
            _ => Ok(None),
        }
    }
}

fn seconds(secs: f32) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f32(secs).map_err(|e| anyhow::anyhow!("{secs} seconds: {e}"))
}

fn default_user_agent() -> String {
    String::from("BizdirBot")
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> usize {
    3
}

fn default_retry_delay() -> f32 {
    1.
}

fn default_throttle() -> Option<Throttle> {
    None
}

fn default_on_dl_error() -> OnError {
    OnError::SkipAndLog
}

fn default_on_scrap_error() -> OnError {
    OnError::SkipAndLog
}

fn default_handle_sigint() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Throttle {
    /// The maximum number of concurrent detail page downloads
    Concurrent(NonZeroUsize),
    /// The delay in seconds after each download
    Delay(f32),
}

impl Default for Throttle {
    fn default() -> Self {
        Self::Concurrent(NonZeroUsize::MIN)
    }
}
