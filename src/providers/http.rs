use crate::core::HttpFetcher;
use crate::core::config::HttpConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

pub const JSON_HEADERS: [(&str, &str); 1] = [("Accept", "application/json")];

pub const HTML_HEADERS: [(&str, &str); 2] = [
    ("Accept", "text/html,application/xhtml+xml,*/*;q=0.8"),
    ("Accept-Language", "es-AR,es;q=0.9,en;q=0.5"),
];

/// Blocking-per-call fetcher over a shared `reqwest` client with a fixed timeout.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    #[instrument(name = "HttpFetch", skip(self, headers))]
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("Unexpected status from {url}"))?;

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;
        debug!(bytes = body.len(), "Fetched response body");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_sends_headers_and_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rates"))
            .and(header("Accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data": []}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = ReqwestFetcher::new(&HttpConfig::default()).unwrap();
        let body = fetcher
            .fetch(&format!("{}/rates", mock_server.uri()), &JSON_HEADERS)
            .await
            .unwrap();
        assert_eq!(body, r#"{"data": []}"#);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked"))
            .respond_with(ResponseTemplate::new(522))
            .mount(&mock_server)
            .await;

        let fetcher = ReqwestFetcher::new(&HttpConfig::default()).unwrap();
        let result = fetcher
            .fetch(&format!("{}/blocked", mock_server.uri()), &HTML_HEADERS)
            .await;
        let error = format!("{:#}", result.unwrap_err());
        assert!(error.contains("Unexpected status"), "{error}");
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(1500)),
            )
            .mount(&mock_server)
            .await;

        let config = HttpConfig {
            timeout_secs: 1,
            ..HttpConfig::default()
        };
        let fetcher = ReqwestFetcher::new(&config).unwrap();
        assert!(fetcher.fetch(&mock_server.uri(), &[]).await.is_err());
    }
}
