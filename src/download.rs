//! Archive downloads

use std::thread;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;

use crate::config::DownloadConfig;
use crate::error::{BundleError, Result};

/// Delay between download attempts
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Source of archive bytes
pub trait BlobFetcher {
    /// Fetch the bytes behind a download locator
    fn fetch_archive(&self, locator: &str) -> Result<Vec<u8>>;
}

impl<F: BlobFetcher + ?Sized> BlobFetcher for &F {
    fn fetch_archive(&self, locator: &str) -> Result<Vec<u8>> {
        (**self).fetch_archive(locator)
    }
}

/// HTTP fetcher with a bounded number of retries
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &DownloadConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("thunderpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            retries: config.retries,
            retry_delay: RETRY_DELAY,
        })
    }

    fn fetch_once(&self, locator: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.client.get(locator).send().map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| e.to_string())
    }
}

impl BlobFetcher for HttpFetcher {
    fn fetch_archive(&self, locator: &str) -> Result<Vec<u8>> {
        with_retries(self.retries, self.retry_delay, locator, |attempt| {
            tracing::debug!("Downloading <{}> (attempt {})", locator, attempt + 1);
            self.fetch_once(locator)
        })
    }
}

/// Run `op` until it succeeds or `retries` extra attempts have failed
fn with_retries<T>(
    retries: u32,
    delay: Duration,
    locator: &str,
    mut op: impl FnMut(u32) -> std::result::Result<T, String>,
) -> Result<T> {
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(reason) if attempt < retries => {
                tracing::warn!("Download of <{}> failed: {}, retrying", locator, reason);
                attempt += 1;
                thread::sleep(delay);
            }
            Err(reason) => {
                return Err(BundleError::Fetch {
                    locator: locator.to_string(),
                    reason: format!("{} (after {} attempt(s))", reason, attempt + 1),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_are_bounded() {
        let mut calls = 0;
        let result: Result<()> = with_retries(2, Duration::ZERO, "https://x.invalid/a.zip", |_| {
            calls += 1;
            Err("HTTP 503".to_string())
        });

        assert_eq!(calls, 3);
        match result.unwrap_err() {
            BundleError::Fetch { locator, reason } => {
                assert_eq!(locator, "https://x.invalid/a.zip");
                assert!(reason.contains("HTTP 503"));
                assert!(reason.contains("3 attempt"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_retry_recovers() {
        let result = with_retries(3, Duration::ZERO, "loc", |attempt| {
            if attempt < 2 {
                Err("timeout".to_string())
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn test_no_retries() {
        let mut calls = 0;
        let result: Result<()> = with_retries(0, Duration::ZERO, "loc", |_| {
            calls += 1;
            Err("refused".to_string())
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
