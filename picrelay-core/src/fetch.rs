//! Remote fetcher: authenticated download of an attachment's private URL.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::contract::{ByteStream, Fetcher};
use crate::error::FetchError;

/// Every network call gets a bounded timeout so a stalled download cannot
/// suspend a pipeline indefinitely.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// [`Fetcher`] over reqwest with bearer-style authorization. Redirects are
/// followed (reqwest's default policy); nothing is retried.
pub struct HttpFetcher {
    client: reqwest::Client,
    token: String,
}

impl HttpFetcher {
    pub fn new(token: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<ByteStream, FetchError> {
        tracing::debug!(url, "fetching private attachment");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, status = status.as_u16(), "download rejected");
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(Box::pin(response.bytes_stream().map_err(FetchError::from)))
    }
}
