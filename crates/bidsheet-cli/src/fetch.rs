use reqwest::blocking::Client;
use reqwest::{header, StatusCode};
use std::time::Duration;

use crate::error::FetchError;

const USER_AGENT: &str = concat!("bidsheet/", env!("CARGO_PKG_VERSION"));
const BASE_BACKOFF_MS: u64 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Delay before retry number `attempt + 1`: `base * 2^attempt`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Retrieves notice PDFs from a URL or a local path.
pub struct Fetcher {
    client: Client,
    retries: u32,
    base_backoff: Duration,
}

impl Fetcher {
    pub fn new(retries: u32) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Fetcher {
            client,
            retries,
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
        })
    }

    pub fn fetch(&self, source: &str) -> Result<Vec<u8>, FetchError> {
        if is_remote(source) {
            self.fetch_with_retry(source)
        } else {
            read_local(source)
        }
    }

    fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url) {
                Ok(bytes) => return Ok(bytes),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let backoff = backoff_delay(self.base_backoff, attempt);
                    tracing::warn!(
                        url,
                        attempt = attempt + 1,
                        max = self.retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "fetch failed, backing off"
                    );
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fetch_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(url, "downloading");
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/pdf,*/*")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
                StatusCode::NOT_FOUND => FetchError::NotFound(url.to_string()),
                _ => FetchError::Http(status),
            });
        }

        let body = response.bytes()?;
        tracing::debug!(url, bytes = body.len(), "downloaded");
        Ok(body.to_vec())
    }
}

fn read_local(path: &str) -> Result<Vec<u8>, FetchError> {
    std::fs::read(path).map_err(|source| FetchError::Local {
        path: path.to_string(),
        source,
    })
}
