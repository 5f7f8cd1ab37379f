//! Cigna experience rating
//!
//! Rates on the current period alone. Every amount line carries the PMPM and
//! its annual dollars (PMPM x annualized member months) side by side.

use serde::{Deserialize, Serialize};

use crate::claims::{Carrier, ManualRates, UniversalInput};
use crate::error::Result;
use crate::rating::parameters::validate_adjustments;
use crate::rating::{
    steps, AdjustmentFactor, CalculationSheet, CredibilityFormula, CredibilityParameters, PeriodUse, PeriodWeights,
    PoolingCharge, Precision, RatingContext, RatingParameters, RenewalResult, RetentionLoad, TrendAssumption,
};
use super::{common, ensure_carrier, CarrierCalculator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CignaParameters {
    pub rating: RatingParameters,

    #[serde(default)]
    pub factors: Vec<AdjustmentFactor>,
}

impl CignaParameters {
    /// All weight on the current period, square-root credibility
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
                weights: PeriodWeights::current_only(),
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
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rating.validate()?;
        validate_adjustments(&self.factors)
    }
}

pub struct CignaCalculator {
    params: CignaParameters,
}

impl CignaCalculator {
    pub fn new(params: CignaParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &CignaParameters {
        &self.params
    }
}

impl CarrierCalculator for CignaCalculator {
    fn carrier(&self) -> Carrier {
        Carrier::Cigna
    }

    fn calculate(&self, input: &UniversalInput) -> Result<RenewalResult> {
        ensure_carrier(Carrier::Cigna, input)?;
        let rating = &self.params.rating;
        let ctx = RatingContext::prepare(input, rating, PeriodUse::CurrentOnly)?;
        let mut sheet = CalculationSheet::new(rating.precision);
        let period = &ctx.periods.current;
        let mm = period.member_months;

        sheet.scalar("Member months", mm.total);
        let raw = steps::claims_pmpm(period, &mut sheet);
        let incurred = sheet.dual("Incurred claims", raw, &mm);
        let pooled = sheet.dual("Claims above pooling threshold", ctx.pooling.current.poolable_pmpm, &mm);
        let net = sheet.dual("Net claims", incurred - pooled, &mm);
        let charge = sheet.dual("Pooling charge", steps::pooling_charge(net, rating.pooling_charge), &mm);
        let pooled_net = sheet.dual("Net claims with pooling charge", net + charge, &mm);

        for factor in &self.params.factors {
            sheet.factor(&format!("{} factor", factor.name), factor.pair());
        }
        let combined = steps::combined_factor(&self.params.factors);
        let adjusted = sheet.dual("Adjusted claims", pooled_net.scale_by(combined), &mm);

        let months = sheet.scalar("Months of trend", ctx.trend_months.current);
        let trend = sheet.factor("Trend factor", steps::trend_factor(&rating.trend, months));
        let projected = sheet.dual("Projected claims", adjusted.scale_by(trend), &mm);

        let z = steps::credibility(
            rating.credibility.formula,
            period.raw_member_months.total,
            rating.credibility.full_credibility_member_months,
        );
        sheet.scalar("Credibility", z);
        let manual = sheet.dual("Manual claims", ctx.manual_rates.figures(), &mm);
        let blended = sheet.dual("Blended claims", steps::blend(projected, manual, z), &mm);

        let retention = sheet.dual("Retention", common::total_retention(rating, blended), &mm);
        let premium = sheet.dual("Renewal premium", blended + retention, &mm);

        Ok(common::finish(Carrier::Cigna, input, ctx, sheet, premium, rating, z))
    }
}
