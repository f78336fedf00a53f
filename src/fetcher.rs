//! Per-wallet fallback chain over the configured rate sources
//!
//! Order is fixed: the structured API first (a hit there ends the chain), then every
//! HTML source in turn. Every attempt yields exactly one audit report.

use crate::core::config::AppConfig;
use crate::core::{
    HttpFetcher, RateCandidate, RateExtractor, RateSource, SourceAttemptReport, SourceDescriptor,
    WalletRegistry, WalletTarget,
};
use crate::providers::{CachingFetcher, HtmlSource, StructuredApiSource};
use std::sync::Arc;
use tracing::{info, warn};

const REGISTRY_SOURCE: &str = "registry";

pub struct SourceFetcher {
    registry: Arc<WalletRegistry>,
    structured: Option<Arc<dyn RateSource>>,
    html_sources: Vec<Arc<dyn RateSource>>,
    page_cache: Option<Arc<CachingFetcher>>,
}

impl SourceFetcher {
    pub fn new(
        registry: Arc<WalletRegistry>,
        structured: Option<Arc<dyn RateSource>>,
        html_sources: Vec<Arc<dyn RateSource>>,
    ) -> Self {
        Self {
            registry,
            structured,
            html_sources,
            page_cache: None,
        }
    }

    /// Wires the sources described by `config` over a shared HTTP fetcher.
    ///
    /// Responses are cached per update cycle, see [`SourceFetcher::begin_cycle`].
    pub fn from_config(config: &AppConfig, http: Arc<dyn HttpFetcher>) -> Self {
        let page_cache = Arc::new(CachingFetcher::new(http));
        let http: Arc<dyn HttpFetcher> = page_cache.clone();
        let extractor = RateExtractor::new(config.extraction.min_tna, config.extraction.max_tna);
        let structured: Arc<dyn RateSource> = Arc::new(StructuredApiSource::new(
            &config.structured_api,
            Arc::clone(&http),
        ));
        let html_sources = config
            .html_sources
            .iter()
            .map(|source| {
                Arc::new(HtmlSource::new(source, extractor.clone(), Arc::clone(&http)))
                    as Arc<dyn RateSource>
            })
            .collect();

        Self {
            page_cache: Some(page_cache),
            ..Self::new(
                Arc::new(config.wallets.clone()),
                Some(structured),
                html_sources,
            )
        }
    }

    /// Forgets responses from the previous cycle.
    pub async fn begin_cycle(&self) {
        if let Some(cache) = &self.page_cache {
            cache.clear().await;
        }
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    pub fn describe_sources(&self) -> Vec<SourceDescriptor> {
        self.structured
            .iter()
            .chain(self.html_sources.iter())
            .map(|source| source.describe())
            .collect()
    }

    async fn attempt(
        source: &dyn RateSource,
        target: &WalletTarget,
        candidates: &mut Vec<RateCandidate>,
        reports: &mut Vec<SourceAttemptReport>,
    ) -> bool {
        match source.fetch_rate(target).await {
            Ok(hit) => {
                info!(
                    wallet = %target.id,
                    source = %hit.source,
                    tna = hit.tna,
                    "Source produced a rate"
                );
                reports.push(SourceAttemptReport::ok(&target.id, &hit.source, hit.tna));
                candidates.push(RateCandidate {
                    wallet: target.id.clone(),
                    source: hit.source,
                    tna: hit.tna,
                    method: source.method(),
                });
                true
            }
            Err(e) => {
                warn!(wallet = %target.id, source = source.id(), "Source failed: {e:#}");
                reports.push(SourceAttemptReport::error(
                    Some(&target.id),
                    source.id(),
                    format!("{e:#}"),
                ));
                false
            }
        }
    }

    /// Runs the fallback chain for one wallet. Never fails: problems become reports.
    pub async fn get_wallet_rate_candidates(
        &self,
        wallet_id: &str,
    ) -> (Vec<RateCandidate>, Vec<SourceAttemptReport>) {
        let mut candidates = Vec::new();
        let mut reports = Vec::new();

        let Some(target) = self.registry.get(wallet_id) else {
            warn!(wallet = wallet_id, "Unknown wallet requested");
            reports.push(SourceAttemptReport::error(
                Some(wallet_id),
                REGISTRY_SOURCE,
                format!("unknown wallet: {wallet_id}"),
            ));
            return (candidates, reports);
        };

        if let Some(structured) = &self.structured
            && Self::attempt(structured.as_ref(), target, &mut candidates, &mut reports).await
        {
            return (candidates, reports);
        }

        for source in &self.html_sources {
            Self::attempt(source.as_ref(), target, &mut candidates, &mut reports).await;
        }

        (candidates, reports)
    }
}
