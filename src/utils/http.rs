//! HTTP transport for catalogue pages.

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::sources::TransportError;
use crate::utils::normalize::normalize_url;
use crate::utils::retry::{with_timeout_ladder, RetryPolicy, Sleeper, TokioSleeper};

/// Desktop-browser user agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Default redirect hop limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// A fetched page before decoding.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Raw response body
    pub bytes: Vec<u8>,
    /// Response headers (used for charset detection)
    pub headers: HeaderMap,
    /// URL after following redirects
    pub final_url: String,
    /// Final HTTP status
    pub status: u16,
}

/// Shared HTTP client bound to the catalogue's base origin.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    base_url: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpClient {
    /// Create a client for `base_url` with the default ladder and user agent
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::build(
            base_url,
            DEFAULT_USER_AGENT,
            DEFAULT_MAX_REDIRECTS,
            RetryPolicy::default(),
        )
    }

    /// Create a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::build(
            &config.source.base_url,
            &config.source.user_agent,
            config.transport.max_redirects,
            config.transport.retry_policy(),
        )
    }

    fn build(
        base_url: &str,
        user_agent: &str,
        max_redirects: usize,
        retry: RetryPolicy,
    ) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        let referer = HeaderValue::from_str(&format!("{}/", base_url))
            .map_err(|e| TransportError::Client(format!("Invalid base URL for Referer: {}", e)))?;
        headers.insert(REFERER, referer);

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(Policy::limited(max_redirects))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| TransportError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            retry,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the sleeper used between retry attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Base origin every relative path is resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch a path or URL, retrying network failures over the timeout ladder.
    pub async fn fetch(&self, path: &str) -> Result<FetchedPage, TransportError> {
        let url = normalize_url(path, &self.base_url);
        tracing::debug!("Fetching {}", url);

        with_timeout_ladder(&self.retry, self.sleeper.as_ref(), |attempt, timeout| {
            let client = Arc::clone(&self.client);
            let url = url.clone();
            async move {
                tracing::trace!("GET {} (attempt {}, timeout {:?})", url, attempt, timeout);

                let response = client
                    .get(&url)
                    .timeout(timeout)
                    .send()
                    .await
                    .map_err(|e| TransportError::from_reqwest(&e, &url))?;

                let status = response.status().as_u16();
                let final_url = response.url().to_string();
                if !(200..=399).contains(&status) {
                    return Err(TransportError::Status {
                        status,
                        url: final_url,
                    });
                }

                let headers = response.headers().clone();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| TransportError::from_reqwest(&e, &url))?;

                Ok(FetchedPage {
                    bytes: bytes.to_vec(),
                    headers,
                    final_url,
                    status,
                })
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn short_ladder_client(base_url: &str, sleeper: Arc<RecordingSleeper>) -> HttpClient {
        let mut config = Config::default();
        config.source.base_url = base_url.to_string();
        config.transport.timeout_ladder_secs = vec![1, 1];
        config.transport.backoff_base_ms = 1;
        config.transport.max_redirects = 2;
        HttpClient::from_config(&config)
            .unwrap()
            .with_sleeper(sleeper)
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = HttpClient::new("https://www.yousuu.com/").unwrap();
        assert_eq!(client.base_url(), "https://www.yousuu.com");
    }

    #[test]
    fn test_invalid_referer_rejected() {
        let result = HttpClient::new("https://bad\nhost");
        assert!(matches!(result, Err(TransportError::Client(_))));
    }

    #[tokio::test]
    async fn test_fetch_sends_referer_and_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let mock = server
            .mock("GET", "/search")
            .match_header("referer", format!("{}/", base).as_str())
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body("<html></html>")
            .create_async()
            .await;

        let client = HttpClient::new(&base).unwrap();
        let page = client.fetch("/search").await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.status, 200);
        assert_eq!(page.final_url, format!("{}/search", base));
        assert_eq!(page.bytes, b"<html></html>".to_vec());
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/search")
            .with_status(302)
            .with_header("location", "/book/7")
            .create_async()
            .await;
        server
            .mock("GET", "/book/7")
            .with_status(200)
            .with_body("detail")
            .create_async()
            .await;

        let client = HttpClient::new(&base).unwrap();
        let page = client.fetch("/search").await.unwrap();

        assert_eq!(page.final_url, format!("{}/book/7", base));
        assert_eq!(page.bytes, b"detail".to_vec());
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(&server.url()).unwrap();
        let result = client.fetch("/missing").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(TransportError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_connection_refused_uses_whole_ladder() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = short_ladder_client(&base, sleeper.clone());
        let result = client.fetch("/search").await;

        match result {
            Err(TransportError::Network { attempts, message }) => {
                assert_eq!(attempts, 2);
                assert!(message.starts_with(&format!("{}/search", base)));
                assert!(!message.contains("Network error"));
            }
            other => panic!("expected network error, got {:?}", other),
        }
        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_millis(1)]);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_client_error_without_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect_at_most(3)
            .create_async()
            .await;

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = short_ladder_client(&server.url(), sleeper.clone());
        let result = client.fetch("/loop").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(TransportError::Client(_))));
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }
}
