use crate::core::{ReconciledRate, SourceAttemptReport, SourceDescriptor, WalletRate, WalletTarget};
use crate::fetcher::SourceFetcher;
use crate::reconcile::reconcile;
use crate::store::WalletRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one update cycle.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    pub wallets: Vec<ReconciledRate>,
    pub sources: Vec<SourceAttemptReport>,
    pub completed_at: DateTime<Utc>,
}

impl UpdateReport {
    /// Records in their public shape, without the internal `method`.
    pub fn records(&self) -> Vec<WalletRate> {
        self.wallets.iter().map(|w| w.record.clone()).collect()
    }
}

/// Network-free description of what an update would consult.
#[derive(Debug, Clone, Serialize)]
pub struct SourceCatalog {
    pub wallets: Vec<WalletTarget>,
    pub sources: Vec<SourceDescriptor>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SourcesStatus {
    Static {
        probe: bool,
        timestamp: DateTime<Utc>,
        #[serde(flatten)]
        catalog: SourceCatalog,
    },
    Probe {
        probe: bool,
        timestamp: DateTime<Utc>,
        #[serde(flatten)]
        report: UpdateReport,
    },
}

pub struct UpdateCoordinator {
    fetcher: SourceFetcher,
    repository: WalletRepository,
}

impl UpdateCoordinator {
    pub fn new(fetcher: SourceFetcher, repository: WalletRepository) -> Self {
        Self {
            fetcher,
            repository,
        }
    }

    pub fn repository(&self) -> &WalletRepository {
        &self.repository
    }

    /// Reconciles every tracked wallet in registry order, then persists each record.
    pub async fn update_all(&self) -> UpdateReport {
        let mut wallets = Vec::new();
        let mut sources = Vec::new();
        self.fetcher.begin_cycle().await;

        for target in self.fetcher.registry().iter() {
            let (candidates, reports) = self.fetcher.get_wallet_rate_candidates(&target.id).await;
            let reconciled = reconcile(target, &candidates, Utc::now());
            info!(
                wallet = %target.id,
                tna = reconciled.record.tna,
                method = %reconciled.method,
                source = %reconciled.record.source,
                "Wallet reconciled"
            );
            wallets.push(reconciled);
            sources.extend(reports);
        }

        for wallet in &wallets {
            if let Err(e) = self.repository.save(&wallet.record).await {
                warn!(wallet = %wallet.record.id, "Persisting wallet failed: {e:#}");
            }
        }

        UpdateReport {
            wallets,
            sources,
            completed_at: Utc::now(),
        }
    }

    pub fn catalog(&self) -> SourceCatalog {
        SourceCatalog {
            wallets: self.fetcher.registry().iter().cloned().collect(),
            sources: self.fetcher.describe_sources(),
        }
    }

    /// Static source metadata, or with `probe` a full (persisting) update run.
    pub async fn sources_status(&self, probe: bool) -> SourcesStatus {
        if probe {
            SourcesStatus::Probe {
                probe,
                timestamp: Utc::now(),
                report: self.update_all().await,
            }
        } else {
            SourcesStatus::Static {
                probe,
                timestamp: Utc::now(),
                catalog: self.catalog(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CandidateMethod, RateMethod, RateSource, WalletRegistry};
    use crate::fetcher::tests::StubSource;
    use crate::store::DocumentStore;
    use crate::store::memory::MemoryStore;
    use anyhow::{Result, bail};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    fn coordinator_with_store(
        structured: Arc<StubSource>,
        html: Vec<Arc<StubSource>>,
        store: Arc<dyn DocumentStore>,
    ) -> UpdateCoordinator {
        let fetcher = SourceFetcher::new(
            Arc::new(WalletRegistry::default()),
            Some(structured as Arc<dyn RateSource>),
            html.into_iter().map(|s| s as Arc<dyn RateSource>).collect(),
        );
        UpdateCoordinator::new(fetcher, WalletRepository::new(store, "wallets"))
    }

    fn sample_sources() -> (Arc<StubSource>, Vec<Arc<StubSource>>) {
        let structured =
            StubSource::new("argentinadatos", CandidateMethod::StructuredApi, &[("uala", 55.0)]);
        let html = vec![
            StubSource::new("rendimientohoy", CandidateMethod::Scraping, &[("mercado_pago", 54.0)]),
            StubSource::new("comparatasas", CandidateMethod::Scraping, &[("mercado_pago", 56.0)]),
        ];
        (structured, html)
    }

    #[tokio::test]
    async fn test_update_all_reconciles_and_persists_every_wallet() {
        let (structured, html) = sample_sources();
        let store = Arc::new(MemoryStore::new());
        let coordinator = coordinator_with_store(structured, html, store);

        let report = coordinator.update_all().await;

        let ids: Vec<_> = report.wallets.iter().map(|w| w.record.id.as_str()).collect();
        assert_eq!(ids, vec!["mercado_pago", "uala", "naranja_x"]);
        assert_eq!(report.wallets[0].record.tna, 55.0);
        assert_eq!(report.wallets[0].method, RateMethod::ScrapingAverage);
        assert_eq!(report.wallets[1].method, RateMethod::StructuredApi);
        assert_eq!(report.wallets[2].method, RateMethod::Fallback);
        // mercado_pago: api + 2 pages, uala: api, naranja_x: api + 2 pages
        assert_eq!(report.sources.len(), 7);

        let persisted = coordinator.repository().list().await.unwrap();
        assert_eq!(persisted, report.records());
    }

    #[tokio::test]
    async fn test_update_is_idempotent_apart_from_timestamps() {
        let (structured, html) = sample_sources();
        let coordinator =
            coordinator_with_store(structured, html, Arc::new(MemoryStore::new()));

        coordinator.update_all().await;
        let first = coordinator.repository().list().await.unwrap();
        coordinator.update_all().await;
        let second = coordinator.repository().list().await.unwrap();

        let strip = |records: Vec<WalletRate>| -> Vec<String> {
            records
                .into_iter()
                .map(|mut r| {
                    r.updated_at = DateTime::<Utc>::UNIX_EPOCH;
                    serde_json::to_string(&r).unwrap()
                })
                .collect()
        };
        assert_eq!(strip(first), strip(second));
    }

    /// Store rejecting writes for one key.
    struct FlakyStore {
        inner: MemoryStore,
        reject: &'static str,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn upsert(
            &self,
            collection: &str,
            key_field: &str,
            key_value: &str,
            record: Value,
        ) -> Result<()> {
            if key_value == self.reject {
                bail!("write rejected");
            }
            self.inner.upsert(collection, key_field, key_value, record).await
        }

        async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
            self.inner.find_all(collection).await
        }

        async fn find_one(
            &self,
            collection: &str,
            key_field: &str,
            key_value: &str,
        ) -> Result<Option<Value>> {
            self.inner.find_one(collection, key_field, key_value).await
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_block_other_wallets() {
        let (structured, html) = sample_sources();
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            reject: "mercado_pago",
        });
        let coordinator = coordinator_with_store(structured, html, store);

        let report = coordinator.update_all().await;
        assert_eq!(report.wallets.len(), 3);

        let persisted: Vec<_> = coordinator
            .repository()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|w| w.id)
            .collect();
        assert_eq!(persisted, vec!["uala", "naranja_x"]);
    }

    #[tokio::test]
    async fn test_static_status_makes_no_source_calls() {
        let (structured, html) = sample_sources();
        let coordinator = coordinator_with_store(
            Arc::clone(&structured),
            html,
            Arc::new(MemoryStore::new()),
        );

        let status = coordinator.sources_status(false).await;
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["probe"], false);
        assert_eq!(json["wallets"].as_array().unwrap().len(), 3);
        assert_eq!(json["sources"][0]["id"], "argentinadatos");
        assert_eq!(structured.calls(), 0);
        assert!(coordinator.repository().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe_status_runs_pipeline() {
        let (structured, html) = sample_sources();
        let coordinator = coordinator_with_store(
            Arc::clone(&structured),
            html,
            Arc::new(MemoryStore::new()),
        );

        let status = coordinator.sources_status(true).await;
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["probe"], true);
        assert_eq!(json["sources"].as_array().unwrap().len(), 7);
        assert_eq!(json["wallets"][1]["method"], "structured_api");
        assert_eq!(structured.calls(), 3);
        assert_eq!(coordinator.repository().list().await.unwrap().len(), 3);
    }
}
