//! Claims experience records matching the normalized ingestion vocabulary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::figures::{Figures, MemberMonths};

/// Carriers with a supported renewal methodology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Carrier {
    Aetna,
    Bcbs,
    #[serde(alias = "uhc")]
    UnitedHealthcare,
    Cigna,
}

impl Carrier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::Aetna => "aetna",
            Carrier::Bcbs => "bcbs",
            Carrier::UnitedHealthcare => "united_healthcare",
            Carrier::Cigna => "cigna",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar month of enrollment and incurred claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClaimsPoint {
    /// Month label (any day within the month; the first is conventional)
    pub month: NaiveDate,

    /// Total member months enrolled
    pub member_months: f64,

    /// Medical member months when they differ from the total (carve-outs)
    #[serde(default)]
    pub medical_member_months: Option<f64>,

    /// Rx member months when they differ from the total
    #[serde(default)]
    pub rx_member_months: Option<f64>,

    /// Incurred medical claims, excluding capitation
    pub medical_claims: f64,

    /// Capitation payments, reported with medical
    #[serde(default)]
    pub capitation: f64,

    /// Incurred pharmacy claims
    pub rx_claims: f64,
}

impl MonthlyClaimsPoint {
    pub fn new(month: NaiveDate, member_months: f64, medical_claims: f64, rx_claims: f64) -> Self {
        Self {
            month,
            member_months,
            medical_member_months: None,
            rx_member_months: None,
            medical_claims,
            capitation: 0.0,
            rx_claims,
        }
    }

    /// Claims with capitation folded into medical
    pub fn claims(&self) -> Figures {
        Figures::new(self.medical_claims + self.capitation, self.rx_claims)
    }

    pub fn exposure(&self) -> MemberMonths {
        MemberMonths {
            total: self.member_months,
            medical: self.medical_member_months.unwrap_or(self.member_months),
            rx: self.rx_member_months.unwrap_or(self.member_months),
        }
    }
}

/// One high-cost claimant reported by the carrier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LargeClaimant {
    /// Claimant identifier (blank when the row is a placeholder)
    #[serde(default)]
    pub claimant_id: String,

    /// Date the claims were incurred; decides the experience period
    pub incurred_date: NaiveDate,

    #[serde(default)]
    pub total_amount: Option<f64>,

    #[serde(default)]
    pub medical_amount: Option<f64>,

    #[serde(default)]
    pub rx_amount: Option<f64>,

    #[serde(default)]
    pub diagnosis: Option<String>,
}

impl LargeClaimant {
    pub fn new(claimant_id: impl Into<String>, incurred_date: NaiveDate, medical: f64, rx: f64) -> Self {
        Self {
            claimant_id: claimant_id.into(),
            incurred_date,
            total_amount: Some(medical + rx),
            medical_amount: Some(medical),
            rx_amount: Some(rx),
            diagnosis: None,
        }
    }

    pub fn has_identifier(&self) -> bool {
        !self.claimant_id.trim().is_empty()
    }

    pub fn has_amounts(&self) -> bool {
        self.total_amount.is_some() || self.medical_amount.is_some() || self.rx_amount.is_some()
    }
}

/// Book-of-business claims rates blended in where experience lacks credibility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualRates {
    pub medical_pmpm: f64,
    pub rx_pmpm: f64,
}

impl ManualRates {
    pub fn new(medical_pmpm: f64, rx_pmpm: f64) -> Self {
        Self { medical_pmpm, rx_pmpm }
    }

    pub fn figures(&self) -> Figures {
        Figures::new(self.medical_pmpm, self.rx_pmpm)
    }
}

/// Everything a carrier calculation needs from the case itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversalInput {
    pub carrier: Carrier,

    pub case_id: String,

    /// Monthly experience, oldest first
    pub claims: Vec<MonthlyClaimsPoint>,

    #[serde(default)]
    pub large_claimants: Vec<LargeClaimant>,

    /// Overrides the manual rates in the carrier parameters when present
    #[serde(default)]
    pub manual_rates: Option<ManualRates>,

    /// First day of the renewal policy period
    pub renewal_start: NaiveDate,

    /// Last day of the renewal policy period (defaults to one year)
    #[serde(default)]
    pub renewal_end: Option<NaiveDate>,
}
