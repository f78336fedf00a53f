use super::http::JSON_HEADERS;
use crate::core::config::{STRUCTURED_SOURCE_ID, StructuredApiConfig, StructuredEndpoint};
use crate::core::{
    CandidateMethod, HttpFetcher, RateSource, SourceDescriptor, SourcedRate, WalletTarget,
    flatten, match_rate,
};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// JSON financial-data API, tried over a list of candidate endpoints.
pub struct StructuredApiSource {
    endpoints: Vec<StructuredEndpoint>,
    fetcher: Arc<dyn HttpFetcher>,
}

impl StructuredApiSource {
    pub fn new(config: &StructuredApiConfig, fetcher: Arc<dyn HttpFetcher>) -> Self {
        Self {
            endpoints: config.endpoints(),
            fetcher,
        }
    }

    async fn rate_from_url(&self, url: &str, target: &WalletTarget) -> Result<f64> {
        let body = self.fetcher.fetch(url, &JSON_HEADERS).await?;
        let payload: Value = serde_json::from_str(&body).context("Response is not valid JSON")?;
        let rows = flatten(&payload);
        debug!(url, rows = rows.len(), "Flattened structured payload");
        match_rate(&rows, &target.normalized_aliases())
            .ok_or_else(|| anyhow!("no row for {} among {} rows", target.name, rows.len()))
    }
}

#[async_trait]
impl RateSource for StructuredApiSource {
    fn id(&self) -> &str {
        STRUCTURED_SOURCE_ID
    }

    fn method(&self) -> CandidateMethod {
        CandidateMethod::StructuredApi
    }

    fn describe(&self) -> SourceDescriptor {
        SourceDescriptor {
            id: self.id().to_string(),
            method: self.method(),
            strategy: None,
            endpoints: self.endpoints.iter().map(|e| e.url.clone()).collect(),
        }
    }

    #[instrument(name = "StructuredRateFetch", skip(self, target), fields(wallet = %target.id))]
    async fn fetch_rate(&self, target: &WalletTarget) -> Result<SourcedRate> {
        if self.endpoints.is_empty() {
            bail!("no structured API endpoints configured");
        }

        let mut failures = Vec::new();
        for endpoint in &self.endpoints {
            match self.rate_from_url(&endpoint.url, target).await {
                Ok(tna) => {
                    return Ok(SourcedRate {
                        tna,
                        source: endpoint.source.clone(),
                    });
                }
                Err(e) => {
                    warn!(url = %endpoint.url, "Structured endpoint failed: {e:#}");
                    failures.push(format!("{}: {e:#}", endpoint.url));
                }
            }
        }
        bail!("{}", failures.join("; "))
    }
}
