//! Renewal output structures

use serde::Serialize;

use crate::claims::{Carrier, Periods};
use crate::error::{DataQualityWarning, WarningKind};
use super::lines::CalculationLine;

/// Exposure and horizon behind a renewal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenewalSummary {
    /// Raw member months per period used in the rating
    pub member_months: Periods<f64>,

    /// Months of data per period used in the rating
    pub months: Periods<usize>,

    /// Current period was annualized from a partial year
    pub annualized: bool,

    /// Months of trend applied per period
    pub trend_months: Periods<f64>,
}

/// Credibility achieved and every recovered data issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub credibility: f64,
    pub warnings: Vec<DataQualityWarning>,
}

/// Complete renewal for one case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenewalResult {
    pub carrier: Carrier,

    pub case_id: String,

    /// Audit lines in methodology order
    pub calculations: Vec<CalculationLine>,

    pub final_premium_pmpm: f64,

    pub current_premium_pmpm: f64,

    /// (final - current) / current
    pub rate_change: f64,

    pub summary: RenewalSummary,

    pub data_quality: DataQuality,
}

impl RenewalResult {
    /// Line by its 1-based number
    pub fn line(&self, number: u32) -> Option<&CalculationLine> {
        let index = (number as usize).checked_sub(1)?;
        self.calculations.get(index)
    }

    pub fn find_line(&self, label: &str) -> Option<&CalculationLine> {
        self.calculations.iter().find(|l| l.label == label)
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.data_quality.warnings.iter().any(|w| w.kind == kind)
    }
}
