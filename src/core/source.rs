//! Rate source abstractions

use super::wallet::{CandidateMethod, WalletTarget};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Fetches a URL body as text. Non-2xx statuses and transport failures are errors.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String>;
}

/// Static, network-free description of a configured source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDescriptor {
    pub id: String,
    pub method: CandidateMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub endpoints: Vec<String>,
}

/// A rate and the label of the endpoint that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRate {
    pub tna: f64,
    pub source: String,
}

/// One place a wallet's rate can be read from.
///
/// `Ok` always carries a rate; "page fetched but the wallet is not on it" is an error
/// so it lands in the audit trail like any other failed attempt.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn id(&self) -> &str;

    fn method(&self) -> CandidateMethod;

    fn describe(&self) -> SourceDescriptor;

    /// On success `source` names the endpoint that answered; failures are reported under `id()`.
    async fn fetch_rate(&self, target: &WalletTarget) -> Result<SourcedRate>;
}
