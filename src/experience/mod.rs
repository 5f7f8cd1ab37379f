//! Experience preparation: period normalization and large-claimant pooling

pub mod period;
pub mod large_claims;

pub use period::{normalize, normalization_warnings, ExperiencePeriod, PeriodKind, MIN_HISTORY_MONTHS};
pub use large_claims::{process, ClaimantPolicy, PooledClaimant, PoolingOutcome};
