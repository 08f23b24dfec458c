use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use tracing::debug;

use crate::error::FetchError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Payload retrieval. The only place the pipeline waits on the network.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url)
    }
}

/// Process-wide client. Per-fetcher timeouts are applied on each request.
pub fn http_client() -> Result<&'static Client, FetchError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|err| FetchError::Network {
                url: String::new(),
                message: format!("failed to build http client: {err}"),
            })
    })
}

/// Blocking reqwest fetcher shared by every sport task.
#[derive(Clone)]
pub struct HttpFetcher {
    client: &'static Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client()?,
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let network = |err: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        };
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header(USER_AGENT, "Mozilla/5.0")
            .send()
            .map_err(network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = resp.text().map_err(network)?;
        debug!(url, bytes = body.len(), "fetched payload");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_fetcher_keeps_its_own_timeout() {
        let quick = HttpFetcher::new(Some(3)).expect("client builds");
        let patient = HttpFetcher::new(Some(30)).expect("client builds");
        let default = HttpFetcher::new(None).expect("client builds");

        assert_eq!(quick.timeout(), Duration::from_secs(3));
        assert_eq!(patient.timeout(), Duration::from_secs(30));
        assert_eq!(default.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(std::ptr::eq(quick.client, patient.client));
    }
}
