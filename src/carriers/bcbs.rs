//! BCBS experience rating
//!
//! Same pooling block as Aetna, followed by a carrier-supplied list of
//! adjustment factors and a single retention line. An optional rate cap
//! limits the renewal to `current * (1 + cap)` and is shown as its own line.
//! Multi-plan groups run this calculator once per plan (see `composite`).

use serde::{Deserialize, Serialize};

use crate::claims::{Carrier, ManualRates, UniversalInput};
use crate::error::{RenewalError, Result};
use crate::rating::parameters::validate_adjustments;
use crate::rating::{
    steps, AdjustmentFactor, CalculationSheet, CredibilityFormula, CredibilityParameters, PeriodUse, PeriodWeights,
    PoolingCharge, Precision, RatingContext, RatingParameters, RenewalResult, RetentionLoad, TrendAssumption,
};
use super::{common, ensure_carrier, CarrierCalculator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BcbsParameters {
    pub rating: RatingParameters,

    /// Applied in the order listed
    #[serde(default)]
    pub factors: Vec<AdjustmentFactor>,

    /// Maximum rate increase (0.15 = 15%)
    #[serde(default)]
    pub rate_cap: Option<f64>,
}

impl BcbsParameters {
    /// 75/25 period weights and square-root credibility, no factors or cap
    pub fn standard(
        pooling_threshold: f64,
        trend: TrendAssumption,
        full_credibility_member_months: f64,
        manual_rates: ManualRates,
        current_premium_pmpm: f64,
    ) -> Self {
        Self {
            rating: RatingParameters {
                pooling_threshold,
                pooling_charge: PoolingCharge::PercentOfNet(0.0),
                trend,
                weights: PeriodWeights::new(0.75, 0.25),
                credibility: CredibilityParameters {
                    full_credibility_member_months,
                    formula: CredibilityFormula::SquareRoot,
                    manual_rates: Some(manual_rates),
                },
                retention: RetentionLoad::default(),
                current_premium_pmpm,
                claimant_policy: Default::default(),
                precision: Precision::default(),
            },
            factors: Vec::new(),
            rate_cap: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rating.validate()?;
        validate_adjustments(&self.factors)?;
        if let Some(cap) = self.rate_cap {
            if !cap.is_finite() || cap < 0.0 {
                return Err(RenewalError::invalid_parameter(
                    "rate_cap",
                    format!("must be non-negative, got {}", cap),
                ));
            }
        }
        Ok(())
    }
}

pub struct BcbsCalculator {
    params: BcbsParameters,
}

impl BcbsCalculator {
    pub fn new(params: BcbsParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &BcbsParameters {
        &self.params
    }
}

impl CarrierCalculator for BcbsCalculator {
    fn carrier(&self) -> Carrier {
        Carrier::Bcbs
    }

    fn calculate(&self, input: &UniversalInput) -> Result<RenewalResult> {
        ensure_carrier(Carrier::Bcbs, input)?;
        let rating = &self.params.rating;
        let ctx = RatingContext::prepare(input, rating, PeriodUse::CurrentAndPrior)?;
        let mut sheet = CalculationSheet::new(rating.precision);

        let pooled = common::pooled_experience(&ctx, rating, &mut sheet);
        let adjusted = common::adjust(pooled, &self.params.factors, &mut sheet);
        let projected = common::project(adjusted, &ctx, rating, &mut sheet);
        let (blended, credibility) = common::credibility_blend(projected, &ctx, rating, &mut sheet);

        let retention = sheet.amount("Retention PMPM", common::total_retention(rating, blended));

        let premium = match self.params.rate_cap {
            Some(cap) => {
                let uncapped = sheet.amount("Premium before rate cap PMPM", blended + retention);
                let adjustment = steps::rate_cap_adjustment(uncapped, rating.current_premium_pmpm, cap);
                let adjustment = sheet.amount("Rate cap adjustment PMPM", adjustment);
                if adjustment.total() != 0.0 {
                    log::debug!("{}: rate cap of {:.1}% applied", input.case_id, cap * 100.0);
                }
                uncapped + adjustment
            }
            None => blended + retention,
        };

        let premium = sheet.amount("Renewal premium PMPM", premium);
        Ok(common::finish(Carrier::Bcbs, input, ctx, sheet, premium, rating, credibility))
    }
}
