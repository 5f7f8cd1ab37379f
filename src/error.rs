//! Error taxonomy and data-quality warnings for renewal calculations
//!
//! Structural problems (short history, bad claimant records, bad parameters)
//! are fatal and surface as `Err`. Numeric edge cases are recovered where they
//! happen and leave a [`DataQualityWarning`] behind in the result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while preparing or running a renewal calculation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenewalError {
    /// Fewer months of claims history than the minimum usable series
    #[error("insufficient claims history: {available} months supplied, at least {required} required")]
    InsufficientData { available: usize, required: usize },

    /// A large-claimant record cannot be used as supplied
    #[error("invalid large claimant '{claimant_id}': {reason}")]
    InvalidClaimant { claimant_id: String, reason: String },

    /// A carrier parameter is missing or out of domain
    #[error("invalid parameter '{field}': {reason}")]
    InvalidParameters { field: String, reason: String },

    /// A denominator was zero (or not finite)
    #[error("division guard: {quantity} has a zero denominator")]
    DivisionGuard { quantity: String },
}

impl RenewalError {
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RenewalError::InvalidParameters {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_claimant(claimant_id: impl Into<String>, reason: impl Into<String>) -> Self {
        RenewalError::InvalidClaimant {
            claimant_id: claimant_id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenewalError>;

/// Category of a recovered data-quality issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Zero denominator replaced by a sentinel value
    DivisionGuard,
    /// Large-claimant record dropped under the drop-with-warning policy
    ClaimantDropped,
    /// Prior period shorter than twelve months
    ShortPriorPeriod,
    /// Current period annualized from a partial year
    Annualized,
    /// Month labels not strictly increasing
    UnorderedMonths,
    /// Plan excluded from composite weighting
    ZeroEnrollment,
    /// Prior period supplied but not used by the carrier methodology
    PriorPeriodIgnored,
    /// Current period has no member months, so its experience carries no weight
    NoCurrentExposure,
    /// Large claimants dated outside every period being rated
    ClaimantOutsidePeriods,
}

/// A degradation recorded alongside an otherwise valid result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl DataQualityWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Warning for an error the engine recovers from; `None` for fatal errors
    pub fn recovered(err: &RenewalError) -> Option<Self> {
        let kind = match err {
            RenewalError::DivisionGuard { .. } => WarningKind::DivisionGuard,
            RenewalError::InvalidClaimant { .. } => WarningKind::ClaimantDropped,
            RenewalError::InsufficientData { .. } | RenewalError::InvalidParameters { .. } => {
                return None
            }
        };
        Some(Self::new(kind, err.to_string()))
    }
}

/// Divide, refusing zero or non-finite denominators
pub fn guarded_divide(numerator: f64, denominator: f64, quantity: &str) -> Result<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return Err(RenewalError::DivisionGuard {
            quantity: quantity.to_string(),
        });
    }
    Ok(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_divide() {
        assert_eq!(guarded_divide(10.0, 4.0, "x").unwrap(), 2.5);

        let err = guarded_divide(10.0, 0.0, "claims PMPM").unwrap_err();
        assert_eq!(
            err,
            RenewalError::DivisionGuard { quantity: "claims PMPM".to_string() }
        );
        assert!(guarded_divide(1.0, f64::NAN, "x").is_err());
    }

    #[test]
    fn test_warning_from_error() {
        let err = RenewalError::DivisionGuard { quantity: "prior member months".into() };
        let warning = DataQualityWarning::recovered(&err).unwrap();
        assert_eq!(warning.kind, WarningKind::DivisionGuard);
        assert!(warning.message.contains("prior member months"));

        let err = RenewalError::invalid_claimant("LC-9", "missing total amount");
        assert_eq!(
            DataQualityWarning::recovered(&err).unwrap().kind,
            WarningKind::ClaimantDropped
        );

        let err = RenewalError::InsufficientData { available: 3, required: 4 };
        assert!(DataQualityWarning::recovered(&err).is_none());
    }
}
