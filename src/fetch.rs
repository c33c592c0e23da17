use anyhow::Result;
use futures_util::TryStreamExt;
use std::pin::pin;
use tracing::debug;
use url::Url;

/// Upper bound on the buffer reserved from a `Content-Length` header. Larger
/// bodies still download, the buffer just grows as chunks arrive.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

/// Status and body of a finished GET. The body is only read for 200
/// responses; anything else carries no guaranteed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_ok(self: &Self) -> bool {
        self.status == 200
    }
}

pub trait Fetcher {
    async fn get(self: &Self, url: &Url) -> Result<FetchResponse>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl Fetcher for HttpFetcher {
    async fn get(self: &Self, url: &Url) -> Result<FetchResponse> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(FetchResponse {
                status,
                body: vec![],
            });
        }

        let mut body = Vec::with_capacity(initial_capacity(response.content_length()));
        let mut stream = pin!(response.bytes_stream());
        while let Some(bytes) = stream.try_next().await? {
            body.extend_from_slice(&bytes);
        }
        debug!("Fetched {} bytes", body.len());

        Ok(FetchResponse { status, body })
    }
}

fn initial_capacity(content_length: Option<u64>) -> usize {
    content_length.unwrap_or(0).min(MAX_PREALLOC) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_capacity_is_capped() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(4096)), 4096);
        assert_eq!(initial_capacity(Some(MAX_PREALLOC)), MAX_PREALLOC as usize);
        assert_eq!(initial_capacity(Some(u64::MAX)), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_only_200_is_ok() {
        let response = |status| FetchResponse {
            status,
            body: vec![],
        };
        assert!(response(200).is_ok());
        assert!(!response(204).is_ok());
        assert!(!response(404).is_ok());
    }
}
