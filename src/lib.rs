//! Renewal Engine - Group health renewal rating with carrier-specific methodologies
//!
//! This library provides:
//! - Period normalization of monthly claims and enrollment experience
//! - Large-claimant pooling against per-claimant thresholds
//! - Line-by-line experience rating for Aetna, BCBS, UnitedHealthcare and Cigna
//! - Enrollment-weighted composites for multi-plan BCBS groups
//! - CSV loading for claims and large-claimant reports

pub mod error;
pub mod claims;
pub mod experience;
pub mod rating;
pub mod carriers;
pub mod engine;

// Re-export commonly used types
pub use error::{DataQualityWarning, RenewalError, Result, WarningKind};
pub use claims::{Carrier, LargeClaimant, ManualRates, MonthlyClaimsPoint, UniversalInput};
pub use rating::{CalculationLine, LineValue, RenewalResult};
pub use carriers::{CarrierCalculator, CarrierParameters, CompositeResult, PlanInput, PlanResult};
pub use engine::{calculate_renewal, run, RenewalOutcome, RenewalRequest};
