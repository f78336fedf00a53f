//! Wallet rate records and pipeline-internal types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const DEFAULT_CURRENCY: &str = "ARS";
pub const DEFAULT_CATEGORY: &str = "cuenta_remunerada";

/// Provenance marker stored in `source` when no live source produced a rate.
pub const FALLBACK_SOURCE: &str = "fallback:static";

/// The persisted, public snapshot of a wallet's current rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRate {
    pub id: String,
    pub name: String,
    pub tna: f64,
    #[serde(default)]
    pub max_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// How a candidate rate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateMethod {
    StructuredApi,
    Scraping,
}

/// How the reconciled rate of a wallet was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMethod {
    StructuredApi,
    ScrapingAverage,
    Fallback,
}

impl Display for RateMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateMethod::StructuredApi => "structured_api",
                RateMethod::ScrapingAverage => "scraping_average",
                RateMethod::Fallback => "fallback",
            }
        )
    }
}

/// A single rate observation for a wallet, discarded after reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateCandidate {
    pub wallet: String,
    pub source: String,
    pub tna: f64,
    pub method: CandidateMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Ok,
    Error,
}

/// Audit entry emitted for every source attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceAttemptReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    pub source: String,
    pub status: AttemptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tna: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceAttemptReport {
    pub fn ok(wallet: &str, source: &str, tna: f64) -> Self {
        Self {
            wallet: Some(wallet.to_string()),
            source: source.to_string(),
            status: AttemptStatus::Ok,
            tna: Some(tna),
            error: None,
        }
    }

    pub fn error(wallet: Option<&str>, source: &str, error: impl Into<String>) -> Self {
        Self {
            wallet: wallet.map(str::to_string),
            source: source.to_string(),
            status: AttemptStatus::Error,
            tna: None,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AttemptStatus::Ok
    }
}

/// A reconciled record together with the method that produced it.
///
/// `method` is internal: the persisted and public shape is the bare [`WalletRate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRate {
    #[serde(flatten)]
    pub record: WalletRate,
    pub method: RateMethod,
}

/// Static description of a tracked wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTarget {
    pub id: String,
    pub name: String,
    /// Case-insensitive substrings used to recognise the wallet in JSON rows and HTML.
    pub aliases: Vec<String>,
    #[serde(default)]
    pub fallback_tna: Option<f64>,
}

impl WalletTarget {
    pub fn new(id: &str, name: &str, aliases: &[&str], fallback_tna: Option<f64>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            fallback_tna,
        }
    }

    /// Aliases lowercased, with empty entries dropped.
    pub fn normalized_aliases(&self) -> Vec<String> {
        self.aliases
            .iter()
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// Fixed, ordered set of wallets tracked by the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletRegistry {
    targets: Vec<WalletTarget>,
}

impl WalletRegistry {
    pub fn new(targets: Vec<WalletTarget>) -> Self {
        Self { targets }
    }

    pub fn get(&self, id: &str) -> Option<&WalletTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WalletTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for WalletRegistry {
    fn default() -> Self {
        Self::new(vec![
            WalletTarget::new(
                "mercado_pago",
                "Mercado Pago",
                &["mercado pago", "mercadopago"],
                Some(54.2),
            ),
            WalletTarget::new("uala", "Ualá", &["ualá", "uala"], Some(55.0)),
            WalletTarget::new("naranja_x", "Naranja X", &["naranja x", "naranjax"], None),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup_and_order() {
        let registry = WalletRegistry::default();
        let ids: Vec<_> = registry.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["mercado_pago", "uala", "naranja_x"]);
        assert_eq!(registry.get("uala").unwrap().name, "Ualá");
        assert!(registry.get("brubank").is_none());
    }

    #[test]
    fn test_normalized_aliases() {
        let target = WalletTarget::new("x", "X", &[" Mercado Pago ", ""], None);
        assert_eq!(target.normalized_aliases(), vec!["mercado pago"]);
    }

    #[test]
    fn test_report_serialization_skips_empty_fields() {
        let report = SourceAttemptReport::error(None, "registry", "unknown wallet: foo");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "error");
        assert!(json.get("wallet").is_none());
        assert!(json.get("tna").is_none());
    }

    #[test]
    fn test_reconciled_rate_flattens_record() {
        let reconciled = ReconciledRate {
            record: WalletRate {
                id: "uala".to_string(),
                name: "Ualá".to_string(),
                tna: 55.0,
                max_amount: 0.0,
                currency: DEFAULT_CURRENCY.to_string(),
                category: DEFAULT_CATEGORY.to_string(),
                updated_at: Utc::now(),
                source: "argentinadatos".to_string(),
            },
            method: RateMethod::StructuredApi,
        };
        let json = serde_json::to_value(&reconciled).unwrap();
        assert_eq!(json["id"], "uala");
        assert_eq!(json["method"], "structured_api");
    }
}
