//! Aetna experience rating
//!
//! Twenty-eight lines in a fixed order:
//!
//! | lines | block                                                  |
//! |-------|--------------------------------------------------------|
//! | 1-6   | incurred PMPM, member months, pooling, pooling charge  |
//! | 7-12  | network, plan design, demographic, underwriting, IBNR  |
//! | 13-16 | trend rate, months of trend, trend factor, projection  |
//! | 17-21 | period weight, weighted experience, credibility blend  |
//! | 22-26 | retention components                                   |
//! | 27-28 | renewal premium and rate change                        |

use serde::{Deserialize, Serialize};

use crate::claims::{Carrier, FactorPair, ManualRates, UniversalInput};
use crate::error::Result;
use crate::rating::parameters::validate_adjustments;
use crate::rating::{
    steps, AdjustmentFactor, CalculationSheet, CredibilityFormula, CredibilityParameters, PeriodUse, PeriodWeights,
    PoolingCharge, Precision, RatingContext, RatingParameters, RenewalResult, RetentionLoad, TrendAssumption,
};
use super::{common, ensure_carrier, CarrierCalculator};

/// Lines in every Aetna renewal
pub const AETNA_LINE_COUNT: usize = 28;

/// The five published Aetna adjustment factors, neutral by default
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AetnaFactors {
    #[serde(default)]
    pub network: FactorPair,
    #[serde(default)]
    pub plan_design: FactorPair,
    #[serde(default)]
    pub demographic: FactorPair,
    #[serde(default)]
    pub underwriting: FactorPair,
    #[serde(default)]
    pub ibnr: FactorPair,
}

impl AetnaFactors {
    /// Factors in application order
    pub fn adjustments(&self) -> Vec<AdjustmentFactor> {
        [
            ("Network", self.network),
            ("Plan design", self.plan_design),
            ("Demographic", self.demographic),
            ("Underwriting", self.underwriting),
            ("IBNR", self.ibnr),
        ]
        .into_iter()
        .map(|(name, pair)| AdjustmentFactor::new(name, pair.medical, pair.rx))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AetnaParameters {
    pub rating: RatingParameters,
    #[serde(default)]
    pub factors: AetnaFactors,
}

impl AetnaParameters {
    /// 70/30 period weights, square-root credibility, neutral factors, no
    /// pooling charge or retention until the caller sets them
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
                weights: PeriodWeights::new(0.7, 0.3),
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
            factors: AetnaFactors::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rating.validate()?;
        validate_adjustments(&self.factors.adjustments())
    }
}

pub struct AetnaCalculator {
    params: AetnaParameters,
}

impl AetnaCalculator {
    pub fn new(params: AetnaParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &AetnaParameters {
        &self.params
    }
}

impl CarrierCalculator for AetnaCalculator {
    fn carrier(&self) -> Carrier {
        Carrier::Aetna
    }

    fn calculate(&self, input: &UniversalInput) -> Result<RenewalResult> {
        ensure_carrier(Carrier::Aetna, input)?;
        let rating = &self.params.rating;
        let ctx = RatingContext::prepare(input, rating, PeriodUse::CurrentAndPrior)?;
        let mut sheet = CalculationSheet::new(rating.precision);

        // 1-6
        let pooled = common::pooled_experience(&ctx, rating, &mut sheet);

        // 7-12
        let adjusted = common::adjust(pooled, &self.params.factors.adjustments(), &mut sheet);

        // 13-16
        let annual = rating.trend.annual_rates();
        sheet.factors("Annual trend rate", adjusted.map(|_| annual));
        let projected = common::project(adjusted, &ctx, rating, &mut sheet);

        // 17-21
        let (blended, credibility) = common::credibility_blend(projected, &ctx, rating, &mut sheet);

        // 22-26
        let mut premium = blended;
        for (label, component) in rating.retention.components() {
            premium += sheet.amount(label, steps::retention_pmpm(component, blended));
        }

        // 27-28
        let premium = sheet.amount("Renewal premium PMPM", premium);
        Ok(common::finish(Carrier::Aetna, input, ctx, sheet, premium, rating, credibility))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carriers::tests::{assert_lines_consistent, current_total, date, sample_input, sample_manual, sample_trend};
    use crate::claims::MonthlyClaimsPoint;
    use crate::error::{RenewalError, WarningKind};
    use crate::rating::{LineValue, RetentionComponent};
    use approx::assert_relative_eq;

    fn scenario_parameters() -> AetnaParameters {
        let mut params = AetnaParameters::standard(175_000.0, sample_trend(), 7_437.0, sample_manual(), 1_015.25);
        params.rating.pooling_charge = PoolingCharge::PercentOfNet(0.095);
        params.rating.retention = RetentionLoad {
            admin: RetentionComponent::PercentOfClaims(0.07),
            commission: RetentionComponent::PercentOfClaims(0.04),
            premium_tax: RetentionComponent::PercentOfClaims(0.0225),
            risk_margin: RetentionComponent::PercentOfClaims(0.015),
            other: RetentionComponent::PercentOfClaims(0.005),
        };
        params.factors.ibnr = FactorPair::uniform(1.02);
        params
    }

    fn run(params: AetnaParameters, input: &UniversalInput) -> Result<RenewalResult> {
        AetnaCalculator::new(params)?.calculate(input)
    }

    #[test]
    fn test_scenario_twenty_eight_lines() {
        let result = run(scenario_parameters(), &sample_input(Carrier::Aetna)).unwrap();

        assert_eq!(result.calculations.len(), AETNA_LINE_COUNT);
        assert_eq!(result.line(1).unwrap().label, "Incurred claims PMPM");
        assert_relative_eq!(current_total(&result, 1), 804.86, epsilon = 0.01);
        assert_relative_eq!(current_total(&result, 2), 6_928.0, epsilon = 1e-6);
        assert_eq!(result.line(11).unwrap().label, "IBNR factor");
        assert_eq!(result.line(27).unwrap().label, "Renewal premium PMPM");
        assert_eq!(result.line(28).unwrap().label, "Rate change");

        assert!(result.final_premium_pmpm > 600.0 && result.final_premium_pmpm < 1_400.0);
        assert!(result.rate_change > -0.30 && result.rate_change < 1.00);
        assert_relative_eq!(
            result.rate_change,
            (result.final_premium_pmpm - 1_015.25) / 1_015.25,
            epsilon = 1e-3
        );
        assert_relative_eq!(current_total(&result, 27), result.final_premium_pmpm, epsilon = 1e-9);
        assert_lines_consistent(&result);
    }

    #[test]
    fn test_scenario_fully_credible() {
        let result = run(scenario_parameters(), &sample_input(Carrier::Aetna)).unwrap();
        // 6,928 + 7,000 member months is past the 7,437 threshold
        assert_eq!(result.data_quality.credibility, 1.0);
        assert_eq!(current_total(&result, 19), 1.0);
        assert_relative_eq!(current_total(&result, 21), current_total(&result, 18), epsilon = 1e-9);
    }

    #[test]
    fn test_pooling_removes_only_excess() {
        let result = run(scenario_parameters(), &sample_input(Carrier::Aetna)).unwrap();
        match &result.line(3).unwrap().value {
            LineValue::Amount(p) => {
                // 47,000 current excess and 15,000 prior, per member month
                assert_relative_eq!(p.current.total(), 47_000.0 / 6_928.0, epsilon = 0.01);
                assert_relative_eq!(p.prior.unwrap().total(), 15_000.0 / 7_000.0, epsilon = 0.01);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_idempotent() {
        let input = sample_input(Carrier::Aetna);
        let calculator = AetnaCalculator::new(scenario_parameters()).unwrap();
        assert_eq!(calculator.calculate(&input).unwrap(), calculator.calculate(&input).unwrap());
    }

    #[test]
    fn test_four_months_succeeds_three_fails() {
        let mut input = sample_input(Carrier::Aetna);
        input.claims.truncate(4);
        input.large_claimants.clear();
        input.renewal_start = date(2023, 7, 1);
        let result = run(scenario_parameters(), &input).unwrap();
        assert_eq!(result.calculations.len(), AETNA_LINE_COUNT);
        assert!(result.summary.annualized);
        assert!(result.has_warning(WarningKind::Annualized));

        input.claims.truncate(3);
        let err = run(scenario_parameters(), &input).unwrap_err();
        assert_eq!(err, RenewalError::InsufficientData { available: 3, required: 4 });
    }

    #[test]
    fn test_zero_member_months_guarded() {
        let mut input = sample_input(Carrier::Aetna);
        input.large_claimants.clear();
        for point in input.claims.iter_mut().take(12) {
            *point = MonthlyClaimsPoint::new(point.month, 0.0, 0.0, 0.0);
        }
        let result = run(scenario_parameters(), &input).unwrap();
        assert_lines_consistent(&result);
        assert!(result.has_warning(WarningKind::DivisionGuard));
        // Prior without exposure carries no weight
        match &result.line(17).unwrap().value {
            LineValue::Scalar(p) => assert_eq!(p.current, 1.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_current_member_months_uses_prior() {
        let mut input = sample_input(Carrier::Aetna);
        for point in input.claims.iter_mut().skip(12) {
            *point = MonthlyClaimsPoint::new(point.month, 0.0, 0.0, 0.0);
        }
        let result = run(scenario_parameters(), &input).unwrap();
        assert_lines_consistent(&result);
        assert!(result.has_warning(WarningKind::NoCurrentExposure));

        // The empty current period carries no weight
        match &result.line(17).unwrap().value {
            LineValue::Scalar(p) => {
                assert_eq!(p.current, 0.0);
                assert_eq!(p.prior, Some(1.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        // Credibility rests on the prior 7,000 member months alone
        assert_relative_eq!(result.data_quality.credibility, (7_000.0f64 / 7_437.0).sqrt(), epsilon = 1e-9);
        assert!(result.final_premium_pmpm > 900.0);
        assert!(result.rate_change > -0.30 && result.rate_change < 1.0);
    }

    #[test]
    fn test_no_exposure_anywhere_falls_back_to_manual() {
        let mut input = sample_input(Carrier::Aetna);
        input.large_claimants.clear();
        for point in input.claims.iter_mut() {
            *point = MonthlyClaimsPoint::new(point.month, 0.0, 0.0, 0.0);
        }
        let result = run(scenario_parameters(), &input).unwrap();
        assert_lines_consistent(&result);
        assert!(result.has_warning(WarningKind::NoCurrentExposure));
        assert_eq!(result.data_quality.credibility, 0.0);
        // Blended claims are the manual rates
        assert_relative_eq!(current_total(&result, 21), 841.64, epsilon = 0.011);
    }

    #[test]
    fn test_bad_factor_rejected_at_construction() {
        let mut params = scenario_parameters();
        params.factors.network = FactorPair::new(-1.0, 1.0);
        assert!(matches!(
            AetnaCalculator::new(params),
            Err(RenewalError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_unrounded_precision() {
        let mut params = scenario_parameters();
        params.rating.precision = Precision::unrounded();
        let rounded = run(scenario_parameters(), &sample_input(Carrier::Aetna)).unwrap();
        let exact = run(params, &sample_input(Carrier::Aetna)).unwrap();
        assert_relative_eq!(rounded.final_premium_pmpm, exact.final_premium_pmpm, epsilon = 0.5);
    }
}
