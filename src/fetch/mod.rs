//! Loading of the uploaded sheet, from disk or over HTTP.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Response, Url};
use tracing::debug;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Issues the GET behind [`fetch_bytes`]; tests substitute their own.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: Url) -> reqwest::Result<Response>;
}

/// [`HttpClient`] over a shared `reqwest` connection pool.
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: Url) -> reqwest::Result<Response> {
        self.inner.get(url).send().await
    }
}

/// Fetches `url` and returns the response body, failing on non-2xx statuses.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let url = Url::parse(url).with_context(|| format!("invalid URL '{url}'"))?;
    let resp = client.get(url).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Reads a sheet from a local path, or downloads it when `source` is an
/// `http(s)` URL.
#[tracing::instrument(skip(client))]
pub async fn load_source<C: HttpClient>(client: &C, source: &str) -> Result<Vec<u8>> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_bytes(client, source)
            .await
            .with_context(|| format!("failed to download '{source}'"))?
    } else {
        std::fs::read(source).with_context(|| format!("failed to read '{source}'"))?
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingClient;

    #[async_trait]
    impl HttpClient for FailingClient {
        async fn get(&self, _url: Url) -> reqwest::Result<Response> {
            panic!("local paths must not go through the HTTP client");
        }
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let path = std::env::temp_dir().join("class_score_report_fetch_test.csv");
        std::fs::write(&path, "班级,总分\n1,80\n").unwrap();

        let bytes = load_source(&FailingClient, path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(bytes, "班级,总分\n1,80\n".as_bytes());

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load_source(&FailingClient, "/nonexistent/scores.csv").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let result = fetch_bytes(&FailingClient, "not a url").await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_reqwest_client_builds() {
        assert!(ReqwestClient::new().is_ok());
    }
}
