//! UnitedHealthcare experience rating
//!
//! Opens with incurred claim dollars before converting to PMPM, pools with a
//! fixed PMPM charge and skips the separate net-claims line. Retention is a
//! single total line followed by the producer fee.

use serde::{Deserialize, Serialize};

use crate::claims::{Carrier, ManualRates, Periods, UniversalInput};
use crate::error::{RenewalError, Result};
use crate::rating::parameters::validate_adjustments;
use crate::rating::{
    steps, AdjustmentFactor, CalculationSheet, CredibilityFormula, CredibilityParameters, PeriodUse, PeriodWeights,
    PoolingCharge, Precision, RatingContext, RatingParameters, RenewalResult, RetentionLoad, TrendAssumption,
};
use super::{common, ensure_carrier, CarrierCalculator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UhcParameters {
    pub rating: RatingParameters,

    #[serde(default)]
    pub factors: Vec<AdjustmentFactor>,

    /// Broker compensation added after retention
    #[serde(default)]
    pub producer_fee_pmpm: f64,
}

impl UhcParameters {
    /// 75/25 period weights, linear credibility, zero fixed pooling charge
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
                pooling_charge: PoolingCharge::Pmpm { medical: 0.0, rx: 0.0 },
                trend,
                weights: PeriodWeights::new(0.75, 0.25),
                credibility: CredibilityParameters {
                    full_credibility_member_months,
                    formula: CredibilityFormula::Linear,
                    manual_rates: Some(manual_rates),
                },
                retention: RetentionLoad::default(),
                current_premium_pmpm,
                claimant_policy: Default::default(),
                precision: Precision::default(),
            },
            factors: Vec::new(),
            producer_fee_pmpm: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rating.validate()?;
        validate_adjustments(&self.factors)?;
        let fee = self.producer_fee_pmpm;
        if !fee.is_finite() || fee < 0.0 {
            return Err(RenewalError::invalid_parameter(
                "producer_fee_pmpm",
                format!("must be non-negative, got {}", fee),
            ));
        }
        Ok(())
    }
}

pub struct UhcCalculator {
    params: UhcParameters,
}

impl UhcCalculator {
    pub fn new(params: UhcParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &UhcParameters {
        &self.params
    }
}

impl CarrierCalculator for UhcCalculator {
    fn carrier(&self) -> Carrier {
        Carrier::UnitedHealthcare
    }

    fn calculate(&self, input: &UniversalInput) -> Result<RenewalResult> {
        ensure_carrier(Carrier::UnitedHealthcare, input)?;
        let rating = &self.params.rating;
        let ctx = RatingContext::prepare(input, rating, PeriodUse::CurrentAndPrior)?;
        let mut sheet = CalculationSheet::new(rating.precision);

        sheet.amounts("Incurred claims", ctx.periods.map(|p| p.claims));
        sheet.scalars("Member months", ctx.periods.map(|p| p.member_months.total));
        let raw = Periods::new(
            steps::claims_pmpm(&ctx.periods.current, &mut sheet),
            ctx.periods.prior.as_ref().map(|p| steps::claims_pmpm(p, &mut sheet)),
        );
        let incurred = sheet.amounts("Incurred claims PMPM", raw);
        let pooled = sheet.amounts(
            "Claims above pooling threshold PMPM",
            ctx.pooling.map(|outcome| outcome.poolable_pmpm),
        );
        let charge = sheet.amounts(
            "Pooling charge PMPM",
            incurred.zip_with(&pooled, |i, p| steps::pooling_charge(*i - *p, rating.pooling_charge)),
        );
        let experience = Periods::new(
            incurred.current - pooled.current + charge.current,
            incurred.prior.zip(pooled.prior).zip(charge.prior).map(|((i, p), c)| i - p + c),
        );
        let experience = sheet.amounts("Pooled claims PMPM", experience);

        let adjusted = common::adjust(experience, &self.params.factors, &mut sheet);
        let projected = common::project(adjusted, &ctx, rating, &mut sheet);
        let (blended, credibility) = common::credibility_blend(projected, &ctx, rating, &mut sheet);

        let retention = sheet.amount("Total retention PMPM", common::total_retention(rating, blended));
        let fee = sheet.amount("Producer fee PMPM", blended.allocate(self.params.producer_fee_pmpm));

        let premium = sheet.amount("Renewal premium PMPM", blended + retention + fee);
        Ok(common::finish(Carrier::UnitedHealthcare, input, ctx, sheet, premium, rating, credibility))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carriers::tests::{assert_lines_consistent, current_total, sample_input, sample_manual, sample_trend};
    use crate::rating::RetentionComponent;
    use approx::assert_relative_eq;

    fn sample_parameters() -> UhcParameters {
        let mut params = UhcParameters::standard(250_000.0, sample_trend(), 12_000.0, sample_manual(), 1_015.25);
        params.rating.pooling_charge = PoolingCharge::Pmpm { medical: 18.0, rx: 2.5 };
        params.rating.retention.admin = RetentionComponent::Pmpm(55.0);
        params.rating.retention.premium_tax = RetentionComponent::PercentOfClaims(0.0225);
        params.factors = vec![AdjustmentFactor::new("Plan change", 0.985, 1.0)];
        params.producer_fee_pmpm = 22.0;
        params
    }

    #[test]
    fn test_leading_dollar_line() {
        let result = UhcCalculator::new(sample_parameters())
            .unwrap()
            .calculate(&sample_input(Carrier::UnitedHealthcare))
            .unwrap();

        assert_eq!(result.line(1).unwrap().label, "Incurred claims");
        // 12 months of 804.86 PMPM on 6,928 member months
        assert_relative_eq!(current_total(&result, 1), 804.86 * 6_928.0, epsilon = 1.0);
        assert_relative_eq!(current_total(&result, 3), 804.86, epsilon = 0.01);
        // No claimant exceeds 250,000
        assert_eq!(current_total(&result, 4), 0.0);
        assert_relative_eq!(current_total(&result, 5), 20.5, epsilon = 1e-9);
        assert_relative_eq!(current_total(&result, 6), 825.36, epsilon = 1e-6);
        assert_lines_consistent(&result);
    }

    #[test]
    fn test_producer_fee_line_before_premium() {
        let result = UhcCalculator::new(sample_parameters())
            .unwrap()
            .calculate(&sample_input(Carrier::UnitedHealthcare))
            .unwrap();

        let n = result.calculations.len() as u32;
        assert_eq!(result.line(n).unwrap().label, "Rate change");
        assert_eq!(result.line(n - 1).unwrap().label, "Renewal premium PMPM");
        assert_eq!(result.line(n - 2).unwrap().label, "Producer fee PMPM");
        assert_eq!(result.line(n - 3).unwrap().label, "Total retention PMPM");
        assert_relative_eq!(current_total(&result, n - 2), 22.0, epsilon = 0.011);
    }

    #[test]
    fn test_linear_credibility() {
        let result = UhcCalculator::new(sample_parameters())
            .unwrap()
            .calculate(&sample_input(Carrier::UnitedHealthcare))
            .unwrap();
        assert_relative_eq!(result.data_quality.credibility, 1.0);

        let mut params = sample_parameters();
        params.rating.credibility.full_credibility_member_months = 27_856.0;
        let result = UhcCalculator::new(params)
            .unwrap()
            .calculate(&sample_input(Carrier::UnitedHealthcare))
            .unwrap();
        assert_relative_eq!(result.data_quality.credibility, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_negative_producer_fee_rejected() {
        let mut params = sample_parameters();
        params.producer_fee_pmpm = -1.0;
        assert!(UhcCalculator::new(params).is_err());
    }
}
