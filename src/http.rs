//! HTTP client seam for reachability checks and imports.
//!
//! The resolver and importer talk to remote origins through this trait so
//! they stay testable without a network. Production code uses the reqwest
//! implementation; tests substitute canned responses.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header;

use crate::error::Result;
use crate::store::ByteStream;

/// Result of a HEAD request.
#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub status: u16,
}

impl HeadResponse {
    /// "Success-ish": anything beyond 204 is treated as unreachable.
    pub fn is_reachable(&self) -> bool {
        self.status <= 204
    }
}

/// Result of a GET request, with the body as a chunk stream.
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub last_modified: Option<String>,
    pub body: ByteStream,
}

/// HTTP operations the asset pipeline needs.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn head(&self, url: &str) -> Result<HeadResponse>;

    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// reqwest-backed client.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn head(&self, url: &str) -> Result<HeadResponse> {
        let response = self.client.head(url).send().await?;
        Ok(HeadResponse {
            status: response.status().as_u16(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        let header_str = |name: header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header_str(header::CONTENT_TYPE);
        let last_modified = header_str(header::LAST_MODIFIED);
        let content_length = response.content_length();

        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
        );

        Ok(FetchResponse {
            status,
            content_type,
            content_length,
            last_modified,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reachability_threshold() {
        assert!(HeadResponse { status: 200 }.is_reachable());
        assert!(HeadResponse { status: 204 }.is_reachable());
        assert!(!HeadResponse { status: 301 }.is_reachable());
        assert!(!HeadResponse { status: 404 }.is_reachable());
        assert!(!HeadResponse { status: 500 }.is_reachable());
    }
}
