use super::http::HTML_HEADERS;
use crate::core::config::HtmlSourceConfig;
use crate::core::{
    CandidateMethod, ExtractionStrategy, HttpFetcher, RateExtractor, RateSource, SourceDescriptor,
    SourcedRate, WalletTarget,
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A comparison page scraped for wallet rates.
pub struct HtmlSource {
    id: String,
    url: String,
    mirror_url: Option<String>,
    strategy: ExtractionStrategy,
    extractor: RateExtractor,
    fetcher: Arc<dyn HttpFetcher>,
}

impl HtmlSource {
    pub fn new(
        config: &HtmlSourceConfig,
        extractor: RateExtractor,
        fetcher: Arc<dyn HttpFetcher>,
    ) -> Self {
        Self {
            id: config.id.clone(),
            url: config.url.clone(),
            mirror_url: config.mirror_url.clone(),
            strategy: config.strategy(),
            extractor,
            fetcher,
        }
    }

    /// Fetches the page, going through the mirror when the primary URL is unreachable.
    async fn fetch_page(&self) -> Result<String> {
        let primary = match self.fetcher.fetch(&self.url, &HTML_HEADERS).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };
        let Some(mirror) = &self.mirror_url else {
            return Err(primary);
        };

        warn!(source = %self.id, "Primary URL failed ({primary:#}), trying mirror");
        self.fetcher
            .fetch(mirror, &HTML_HEADERS)
            .await
            .map_err(|e| anyhow!("{primary:#}; mirror: {e:#}"))
    }
}

#[async_trait]
impl RateSource for HtmlSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn method(&self) -> CandidateMethod {
        CandidateMethod::Scraping
    }

    fn describe(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: self.id.clone(),
            method: self.method(),
            strategy: Some(self.strategy.to_string()),
            endpoints: std::iter::once(self.url.clone())
                .chain(self.mirror_url.clone())
                .collect(),
        }
    }

    #[instrument(name = "HtmlRateFetch", skip(self, target), fields(source = %self.id, wallet = %target.id))]
    async fn fetch_rate(&self, target: &WalletTarget) -> Result<SourcedRate> {
        let html = self.fetch_page().await?;
        let aliases = target.normalized_aliases();
        let rate = self
            .extractor
            .extract_with(self.strategy, &html, &aliases)
            .ok_or_else(|| anyhow!("no rate found for {} ({})", target.name, self.strategy))?;
        debug!(rate, "Extracted rate from page");
        Ok(SourcedRate {
            tna: rate,
            source: self.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::HttpConfig;
    use crate::providers::http::ReqwestFetcher;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    fn html_source(server: &MockServer, route: &str, mirror: Option<&str>) -> HtmlSource {
        let config = HtmlSourceConfig {
            id: "comparatasas".to_string(),
            url: format!("{}{}", server.uri(), route),
            strategy: Some(ExtractionStrategy::ComparaTasas),
            mirror_url: mirror.map(|m| format!("{}{}", server.uri(), m)),
        };
        let fetcher = Arc::new(ReqwestFetcher::new(&HttpConfig::default()).unwrap());
        HtmlSource::new(&config, RateExtractor::default(), fetcher)
    }

    fn mercado_pago() -> WalletTarget {
        WalletTarget::new("mercado_pago", "Mercado Pago", &["mercado pago"], None)
    }

    #[tokio::test]
    async fn test_extracts_rate_from_page() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/billeteras",
            200,
            "<table><tr><td>Mercado Pago</td><td>54,5% TNA</td></tr></table>",
        )
        .await;

        let source = html_source(&server, "/billeteras", None);
        assert_eq!(source.fetch_rate(&mercado_pago()).await.unwrap().tna, 54.5);
    }

    #[tokio::test]
    async fn test_mirror_used_when_primary_blocked() {
        let server = MockServer::start().await;
        mount(&server, "/billeteras", 522, "").await;
        mount(&server, "/mirror", 200, "Mercado Pago | 52% TNA").await;

        let source = html_source(&server, "/billeteras", Some("/mirror"));
        assert_eq!(source.fetch_rate(&mercado_pago()).await.unwrap().tna, 52.0);
    }

    #[tokio::test]
    async fn test_missing_wallet_is_error() {
        let server = MockServer::start().await;
        mount(&server, "/billeteras", 200, "<p>Brubank 40% TNA</p>").await;

        let source = html_source(&server, "/billeteras", None);
        let error = source.fetch_rate(&mercado_pago()).await.unwrap_err();
        assert!(error.to_string().contains("no rate found for Mercado Pago"));
    }

    #[tokio::test]
    async fn test_primary_and_mirror_failing() {
        let server = MockServer::start().await;
        mount(&server, "/billeteras", 522, "").await;
        mount(&server, "/mirror", 500, "").await;

        let source = html_source(&server, "/billeteras", Some("/mirror"));
        let error = source.fetch_rate(&mercado_pago()).await.unwrap_err();
        assert!(error.to_string().contains("mirror:"));
    }
}
