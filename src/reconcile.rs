use crate::core::wallet::{DEFAULT_CATEGORY, DEFAULT_CURRENCY, FALLBACK_SOURCE};
use crate::core::{
    CandidateMethod, RateCandidate, RateMethod, ReconciledRate, WalletRate, WalletTarget,
};
use chrono::{DateTime, Utc};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Collapses a wallet's candidates into one authoritative record.
///
/// The rate is the mean of all candidates (two decimals). With no candidates the
/// wallet's static fallback applies, or 0 when it has none.
pub fn reconcile(
    target: &WalletTarget,
    candidates: &[RateCandidate],
    now: DateTime<Utc>,
) -> ReconciledRate {
    let (tna, source, method) = if candidates.is_empty() {
        (
            target.fallback_tna.unwrap_or(0.0),
            FALLBACK_SOURCE.to_string(),
            RateMethod::Fallback,
        )
    } else {
        let mean = candidates.iter().map(|c| c.tna).sum::<f64>() / candidates.len() as f64;
        let source = candidates
            .iter()
            .map(|c| c.source.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let method = match candidates {
            [only] if only.method == CandidateMethod::StructuredApi => RateMethod::StructuredApi,
            _ => RateMethod::ScrapingAverage,
        };
        (round2(mean), source, method)
    };

    ReconciledRate {
        record: WalletRate {
            id: target.id.clone(),
            name: target.name.clone(),
            tna,
            max_amount: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            updated_at: now,
            source,
        },
        method,
    }
}
