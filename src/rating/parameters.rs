//! Rating parameters shared by every carrier methodology
//!
//! Carrier parameter sets embed a [`RatingParameters`] and add their own
//! factor lists and adjustments. Everything here is validated once, when a
//! calculator is built, and read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::claims::{FactorPair, ManualRates};
use crate::error::{RenewalError, Result};
use crate::experience::ClaimantPolicy;

/// Allowed drift when checking that period weights sum to one
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Load that replaces the risk removed by pooling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolingCharge {
    /// Percentage of net (post-pooling) claims PMPM
    PercentOfNet(f64),
    /// Fixed PMPM charge
    Pmpm { medical: f64, rx: f64 },
}

/// Annual claims trend and the projection horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendAssumption {
    /// Annual medical trend rate (0.0969 = 9.69%)
    pub medical_annual: f64,

    /// Annual rx trend rate
    pub rx_annual: f64,

    /// Months from the current experience midpoint to the renewal midpoint.
    /// Derived from the effective dates when absent.
    #[serde(default)]
    pub months_to_midpoint: Option<f64>,
}

impl TrendAssumption {
    pub fn annual_rates(&self) -> FactorPair {
        FactorPair::new(self.medical_annual, self.rx_annual)
    }
}

/// Blend of current and prior period projections
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodWeights {
    pub current: f64,
    pub prior: f64,
}

impl PeriodWeights {
    pub fn new(current: f64, prior: f64) -> Self {
        Self { current, prior }
    }

    /// All weight on the current period
    pub fn current_only() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn sum(&self) -> f64 {
        self.current + self.prior
    }
}

/// Shape of the credibility curve applied to `member months / full credibility`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredibilityFormula {
    /// z = sqrt(ratio)
    #[default]
    SquareRoot,
    /// z = ratio
    Linear,
    /// z = ratio^exponent
    Power { exponent: f64 },
}

impl CredibilityFormula {
    pub fn apply(&self, ratio: f64) -> f64 {
        match self {
            CredibilityFormula::SquareRoot => ratio.sqrt(),
            CredibilityFormula::Linear => ratio,
            CredibilityFormula::Power { exponent } => ratio.powf(*exponent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CredibilityParameters {
    /// Member months at which experience is fully credible
    pub full_credibility_member_months: f64,

    #[serde(default)]
    pub formula: CredibilityFormula,

    /// Manual claims rates; the case input may override them
    #[serde(default)]
    pub manual_rates: Option<ManualRates>,
}

/// One retention component, either flat or proportional to blended claims
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionComponent {
    /// Dollars per member per month
    Pmpm(f64),
    /// Fraction of the credibility-blended claims PMPM
    PercentOfClaims(f64),
}

impl Default for RetentionComponent {
    fn default() -> Self {
        RetentionComponent::Pmpm(0.0)
    }
}

/// Non-claims load added to projected claims
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RetentionLoad {
    #[serde(default)]
    pub admin: RetentionComponent,
    #[serde(default)]
    pub commission: RetentionComponent,
    #[serde(default)]
    pub premium_tax: RetentionComponent,
    #[serde(default)]
    pub risk_margin: RetentionComponent,
    #[serde(default)]
    pub other: RetentionComponent,
}

impl RetentionLoad {
    /// Components with their line labels, in loading order
    pub fn components(&self) -> [(&'static str, RetentionComponent); 5] {
        [
            ("Administrative expense PMPM", self.admin),
            ("Commission PMPM", self.commission),
            ("Premium tax PMPM", self.premium_tax),
            ("Risk margin PMPM", self.risk_margin),
            ("Other retention PMPM", self.other),
        ]
    }
}

fn default_amount_decimals() -> Option<u32> {
    Some(2)
}

/// Rounding applied to amount lines as they are recorded
///
/// Calculation continues from the rounded values, so the audit table is the
/// arithmetic. Factors, weights, credibility and rate change are not rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    /// Decimal places for dollar and PMPM amounts; `None` keeps full precision
    #[serde(default = "default_amount_decimals")]
    pub amount_decimals: Option<u32>,
}

impl Precision {
    pub fn unrounded() -> Self {
        Self { amount_decimals: None }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            amount_decimals: default_amount_decimals(),
        }
    }
}

/// A named multiplicative adjustment (network, plan design, IBNR, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentFactor {
    pub name: String,
    pub medical: f64,
    pub rx: f64,
}

impl AdjustmentFactor {
    pub fn new(name: impl Into<String>, medical: f64, rx: f64) -> Self {
        Self {
            name: name.into(),
            medical,
            rx,
        }
    }

    pub fn neutral(name: impl Into<String>) -> Self {
        Self::new(name, 1.0, 1.0)
    }

    pub fn pair(&self) -> FactorPair {
        FactorPair::new(self.medical, self.rx)
    }
}

/// Parameters common to every carrier methodology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingParameters {
    /// Per-claimant pooling (stop-loss) level in dollars
    pub pooling_threshold: f64,

    pub pooling_charge: PoolingCharge,

    pub trend: TrendAssumption,

    pub weights: PeriodWeights,

    pub credibility: CredibilityParameters,

    #[serde(default)]
    pub retention: RetentionLoad,

    /// Premium PMPM in force today; the rate change is measured against it
    pub current_premium_pmpm: f64,

    #[serde(default)]
    pub claimant_policy: ClaimantPolicy,

    #[serde(default)]
    pub precision: Precision,
}

fn require(ok: bool, field: &str, reason: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(RenewalError::invalid_parameter(field, reason()))
    }
}

fn is_rate(value: f64) -> bool {
    value.is_finite() && (0.0..1.0).contains(&value)
}

impl RatingParameters {
    /// Check every field is present in a usable domain
    pub fn validate(&self) -> Result<()> {
        let t = self.pooling_threshold;
        require(t.is_finite() && t > 0.0, "pooling_threshold", || format!("must be positive, got {}", t))?;

        match self.pooling_charge {
            PoolingCharge::PercentOfNet(rate) => {
                require(is_rate(rate), "pooling_charge", || format!("percent must be in [0, 1), got {}", rate))?
            }
            PoolingCharge::Pmpm { medical, rx } => require(
                medical.is_finite() && rx.is_finite() && medical >= 0.0 && rx >= 0.0,
                "pooling_charge",
                || format!("PMPM charge must be non-negative, got {}/{}", medical, rx),
            )?,
        }

        let trend = &self.trend;
        for (field, rate) in [("trend.medical_annual", trend.medical_annual), ("trend.rx_annual", trend.rx_annual)] {
            require(rate.is_finite() && rate > -1.0, field, || format!("annual rate must exceed -100%, got {}", rate))?;
        }
        if let Some(months) = trend.months_to_midpoint {
            require(months.is_finite() && months >= 0.0, "trend.months_to_midpoint", || {
                format!("must be non-negative, got {}", months)
            })?;
        }

        let w = &self.weights;
        require(
            w.current.is_finite() && w.prior.is_finite() && w.current >= 0.0 && w.prior >= 0.0,
            "weights",
            || format!("weights must be non-negative, got {}/{}", w.current, w.prior),
        )?;
        require((w.sum() - 1.0).abs() <= WEIGHT_TOLERANCE, "weights", || {
            format!("current + prior must equal 1.0, got {}", w.sum())
        })?;

        let c = &self.credibility;
        let full = c.full_credibility_member_months;
        require(full.is_finite() && full > 0.0, "credibility.full_credibility_member_months", || {
            format!("must be positive, got {}", full)
        })?;
        if let CredibilityFormula::Power { exponent } = c.formula {
            require(exponent.is_finite() && exponent > 0.0, "credibility.formula.exponent", || {
                format!("must be positive, got {}", exponent)
            })?;
        }
        if let Some(manual) = &c.manual_rates {
            validate_manual_rates(manual, "credibility.manual_rates")?;
        }

        for (label, component) in self.retention.components() {
            match component {
                RetentionComponent::Pmpm(v) => {
                    require(v.is_finite() && v >= 0.0, "retention", || format!("{} must be non-negative, got {}", label, v))?
                }
                RetentionComponent::PercentOfClaims(v) => {
                    require(is_rate(v), "retention", || format!("{} percent must be in [0, 1), got {}", label, v))?
                }
            }
        }

        let p = self.current_premium_pmpm;
        require(p.is_finite() && p > 0.0, "current_premium_pmpm", || format!("must be positive, got {}", p))?;

        if let Some(decimals) = self.precision.amount_decimals {
            require(decimals <= 10, "precision.amount_decimals", || format!("at most 10, got {}", decimals))?;
        }

        Ok(())
    }
}

pub fn validate_manual_rates(manual: &ManualRates, field: &str) -> Result<()> {
    require(
        manual.medical_pmpm.is_finite() && manual.rx_pmpm.is_finite() && manual.medical_pmpm >= 0.0 && manual.rx_pmpm >= 0.0,
        field,
        || format!("manual rates must be non-negative, got {}/{}", manual.medical_pmpm, manual.rx_pmpm),
    )
}

/// Factors must be positive finite ratios; 1.0 is neutral
pub fn validate_adjustments(factors: &[AdjustmentFactor]) -> Result<()> {
    for factor in factors {
        require(
            factor.medical.is_finite() && factor.rx.is_finite() && factor.medical > 0.0 && factor.rx > 0.0,
            &format!("adjustments.{}", factor.name),
            || format!("factors must be positive, got {}/{}", factor.medical, factor.rx),
        )?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Neutral parameter set used across the crate's tests
    pub(crate) fn sample_rating() -> RatingParameters {
        RatingParameters {
            pooling_threshold: 175_000.0,
            pooling_charge: PoolingCharge::PercentOfNet(0.095),
            trend: TrendAssumption {
                medical_annual: 0.0969,
                rx_annual: 0.0788,
                months_to_midpoint: Some(19.0),
            },
            weights: PeriodWeights::new(0.7, 0.3),
            credibility: CredibilityParameters {
                full_credibility_member_months: 7_437.0,
                formula: CredibilityFormula::SquareRoot,
                manual_rates: Some(ManualRates::new(637.22, 204.42)),
            },
            retention: RetentionLoad {
                admin: RetentionComponent::PercentOfClaims(0.07),
                commission: RetentionComponent::PercentOfClaims(0.04),
                premium_tax: RetentionComponent::PercentOfClaims(0.0225),
                risk_margin: RetentionComponent::PercentOfClaims(0.015),
                other: RetentionComponent::Pmpm(4.0),
            },
            current_premium_pmpm: 1_015.25,
            claimant_policy: ClaimantPolicy::Reject,
            precision: Precision::default(),
        }
    }

    fn field_of(err: RenewalError) -> String {
        match err {
            RenewalError::InvalidParameters { field, .. } => field,
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_sample_is_valid() {
        assert!(sample_rating().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let mut params = sample_rating();
        params.weights = PeriodWeights::new(0.7, 0.4);
        assert_eq!(field_of(params.validate().unwrap_err()), "weights");

        params.weights = PeriodWeights::new(0.7, 0.3 + 1e-12);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut params = sample_rating();
        params.pooling_threshold = -1.0;
        assert_eq!(field_of(params.validate().unwrap_err()), "pooling_threshold");
    }

    #[test]
    fn test_zero_current_premium_rejected() {
        let mut params = sample_rating();
        params.current_premium_pmpm = 0.0;
        assert_eq!(field_of(params.validate().unwrap_err()), "current_premium_pmpm");
    }

    #[test]
    fn test_percent_retention_bounded() {
        let mut params = sample_rating();
        params.retention.commission = RetentionComponent::PercentOfClaims(1.5);
        assert_eq!(field_of(params.validate().unwrap_err()), "retention");
    }

    #[test]
    fn test_adjustments_positive() {
        let factors = vec![AdjustmentFactor::neutral("network"), AdjustmentFactor::new("ibnr", 0.0, 1.0)];
        assert_eq!(field_of(validate_adjustments(&factors).unwrap_err()), "adjustments.ibnr");
    }

    #[test]
    fn test_parameters_from_json_defaults() {
        let json = r#"{
            "pooling_threshold": 175000,
            "pooling_charge": {"percent_of_net": 0.095},
            "trend": {"medical_annual": 0.0969, "rx_annual": 0.0788},
            "weights": {"current": 0.7, "prior": 0.3},
            "credibility": {"full_credibility_member_months": 7437, "formula": {"type": "power", "exponent": 0.5}},
            "current_premium_pmpm": 1015.25
        }"#;
        let params: RatingParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.precision.amount_decimals, Some(2));
        assert_eq!(params.claimant_policy, ClaimantPolicy::Reject);
        assert_eq!(params.retention.admin, RetentionComponent::Pmpm(0.0));
        assert_eq!(params.trend.months_to_midpoint, None);
        assert_eq!(params.credibility.formula, CredibilityFormula::Power { exponent: 0.5 });
        assert!(params.validate().is_ok());
    }
}
