//! Core domain types and the pure parts of the rate pipeline

pub mod config;
pub mod extract;
pub mod log;
pub mod number;
pub mod payload;
pub mod source;
pub mod wallet;

// Re-export main types for cleaner imports
pub use extract::{ExtractionStrategy, RateExtractor};
pub use number::{parse_number, parse_number_str};
pub use payload::{flatten, match_rate};
pub use source::{HttpFetcher, RateSource, SourceDescriptor, SourcedRate};
pub use wallet::{
    AttemptStatus, CandidateMethod, RateCandidate, RateMethod, ReconciledRate,
    SourceAttemptReport, WalletRate, WalletRegistry, WalletTarget,
};
