//! Pure rating arithmetic shared by every carrier
//!
//! Each carrier calls these in its own order and records the results on its
//! sheet. Nothing here rounds; rounding happens when a value becomes a line.

use crate::claims::{FactorPair, Figures, Periods};
use crate::experience::{ExperiencePeriod, PeriodKind};
use crate::experience::period::PERIOD_MONTHS;
use super::lines::CalculationSheet;
use super::parameters::{
    AdjustmentFactor, CredibilityFormula, PeriodWeights, PoolingCharge, RetentionComponent, TrendAssumption,
};

fn period_name(kind: PeriodKind) -> &'static str {
    match kind {
        PeriodKind::Current => "current",
        PeriodKind::Prior => "prior",
    }
}

/// Claims per member month, medical over medical exposure and rx over rx
pub fn claims_pmpm(period: &ExperiencePeriod, sheet: &mut CalculationSheet) -> Figures {
    let name = period_name(period.kind);
    let mm = &period.member_months;
    let medical = sheet.divide(period.claims.medical(), mm.medical, &format!("{} medical claims PMPM", name));
    let rx = sheet.divide(period.claims.rx(), mm.rx, &format!("{} rx claims PMPM", name));
    Figures::new(medical, rx)
}

/// Load replacing the pooled-out risk
pub fn pooling_charge(net_claims: Figures, charge: PoolingCharge) -> Figures {
    match charge {
        PoolingCharge::PercentOfNet(rate) => net_claims.scale(rate),
        PoolingCharge::Pmpm { medical, rx } => Figures::new(medical, rx),
    }
}

/// Product of adjustment factors, taken in the order given
pub fn combined_factor(factors: &[AdjustmentFactor]) -> FactorPair {
    factors.iter().fold(FactorPair::neutral(), |acc, f| {
        FactorPair::new(acc.medical * f.medical, acc.rx * f.rx)
    })
}

/// Compound trend `(1 + rate)^(months / 12)` per coverage
pub fn trend_factor(trend: &TrendAssumption, months: f64) -> FactorPair {
    let years = months / PERIOD_MONTHS as f64;
    FactorPair::new(
        (1.0 + trend.medical_annual).powf(years),
        (1.0 + trend.rx_annual).powf(years),
    )
}

/// Weights actually applied to the periods at hand
///
/// Without a usable prior (absent, or no member months) the current period
/// takes all the weight. A short prior keeps `months / 12` of its weight and
/// the current period absorbs the rest. A current period without member
/// months hands all the weight to a usable prior; with neither, credibility
/// falls to zero and the manual rates carry the blend.
pub fn effective_weights(weights: PeriodWeights, periods: &Periods<ExperiencePeriod>) -> PeriodWeights {
    let usable_prior = periods.prior.as_ref().filter(|prior| prior.raw_member_months.total > 0.0);
    if !(periods.current.raw_member_months.total > 0.0) {
        return match usable_prior {
            Some(_) => PeriodWeights::new(0.0, 1.0),
            None => PeriodWeights::current_only(),
        };
    }
    match usable_prior {
        Some(prior) if weights.prior > 0.0 => {
            if prior.months >= PERIOD_MONTHS {
                return weights;
            }
            let prior_weight = weights.prior * prior.months as f64 / PERIOD_MONTHS as f64;
            PeriodWeights::new(1.0 - prior_weight, prior_weight)
        }
        _ => PeriodWeights::current_only(),
    }
}

/// Weight per period, for recording as a scalar line
pub fn weight_periods(weights: PeriodWeights, has_prior: bool) -> Periods<f64> {
    Periods::new(weights.current, has_prior.then_some(weights.prior))
}

pub fn weighted_experience(projected: &Periods<Figures>, weights: PeriodWeights) -> Figures {
    let current = projected.current.scale(weights.current);
    match projected.prior {
        Some(prior) if weights.prior > 0.0 => current + prior.scale(weights.prior),
        _ => current,
    }
}

/// Credibility in [0, 1] for the given raw member months
pub fn credibility(formula: CredibilityFormula, member_months: f64, full_credibility: f64) -> f64 {
    if !(member_months > 0.0) || !(full_credibility > 0.0) {
        return 0.0;
    }
    let z = formula.apply(member_months / full_credibility);
    if z.is_nan() {
        0.0
    } else {
        z.clamp(0.0, 1.0)
    }
}

/// z * experience + (1 - z) * manual
pub fn blend(experience: Figures, manual: Figures, z: f64) -> Figures {
    experience.scale(z) + manual.scale(1.0 - z)
}

/// One retention component as PMPM, split like the blended claims
pub fn retention_pmpm(component: RetentionComponent, blended: Figures) -> Figures {
    match component {
        RetentionComponent::Pmpm(pmpm) => blended.allocate(pmpm),
        RetentionComponent::PercentOfClaims(rate) => blended.scale(rate),
    }
}

/// Reduction that brings `premium` down to `current * (1 + cap)`; zero when under
pub fn rate_cap_adjustment(premium: Figures, current_premium: f64, cap: f64) -> Figures {
    let ceiling = current_premium * (1.0 + cap);
    if premium.total() > ceiling {
        premium.allocate(ceiling - premium.total())
    } else {
        Figures::zero()
    }
}

/// (final - current) / current, guarded
pub fn rate_change(final_premium: f64, current_premium: f64, sheet: &mut CalculationSheet) -> f64 {
    sheet.divide(final_premium - current_premium, current_premium, "rate change")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{MemberMonths, MonthlyClaimsPoint};
    use crate::experience::normalize;
    use crate::rating::parameters::Precision;
    use approx::assert_relative_eq;
    use chrono::{Months, NaiveDate};

    fn periods(months: usize, member_months: f64) -> Periods<ExperiencePeriod> {
        let first = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let series: Vec<_> = (0..months)
            .map(|i| {
                let month = first.checked_add_months(Months::new(i as u32)).unwrap();
                MonthlyClaimsPoint::new(month, member_months, 50_000.0, 20_000.0)
            })
            .collect();
        normalize(&series).unwrap()
    }

    #[test]
    fn test_trend_compounds_over_fraction_of_year() {
        let trend = TrendAssumption {
            medical_annual: 0.0969,
            rx_annual: 0.0788,
            months_to_midpoint: None,
        };
        let f = trend_factor(&trend, 19.0);
        assert_relative_eq!(f.medical, 1.0969f64.powf(19.0 / 12.0), epsilon = 1e-12);
        assert_relative_eq!(f.rx, 1.0788f64.powf(19.0 / 12.0), epsilon = 1e-12);

        let flat = trend_factor(&trend, 0.0);
        assert_eq!(flat, FactorPair::neutral());
    }

    #[test]
    fn test_credibility_bounded() {
        for mm in [0.0, 1.0, 7_437.0, 1.0e9, f64::INFINITY] {
            for formula in [
                CredibilityFormula::SquareRoot,
                CredibilityFormula::Linear,
                CredibilityFormula::Power { exponent: 0.4 },
            ] {
                let z = credibility(formula, mm, 7_437.0);
                assert!((0.0..=1.0).contains(&z), "z = {} for mm = {}", z, mm);
            }
        }
        assert_relative_eq!(credibility(CredibilityFormula::SquareRoot, 1_859.25, 7_437.0), 0.5);
        assert_relative_eq!(credibility(CredibilityFormula::Linear, 1_859.25, 7_437.0), 0.25);
        assert_eq!(credibility(CredibilityFormula::SquareRoot, -5.0, 7_437.0), 0.0);
    }

    #[test]
    fn test_blend_endpoints() {
        let experience = Figures::new(600.0, 200.0);
        let manual = Figures::new(637.22, 204.42);
        assert_eq!(blend(experience, manual, 1.0), experience);
        assert_relative_eq!(blend(experience, manual, 0.0).total(), manual.total(), epsilon = 1e-9);
    }

    #[test]
    fn test_weights_full_prior() {
        let p = periods(24, 500.0);
        let w = effective_weights(PeriodWeights::new(0.7, 0.3), &p);
        assert_eq!(w, PeriodWeights::new(0.7, 0.3));
    }

    #[test]
    fn test_weights_short_prior_scaled() {
        let p = periods(18, 500.0);
        let w = effective_weights(PeriodWeights::new(0.7, 0.3), &p);
        assert_relative_eq!(w.prior, 0.15, epsilon = 1e-12);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_without_prior() {
        let p = periods(10, 500.0);
        assert_eq!(effective_weights(PeriodWeights::new(0.75, 0.25), &p), PeriodWeights::current_only());
    }

    #[test]
    fn test_weights_move_to_prior_without_current_exposure() {
        let mut p = periods(24, 500.0);
        p.current.raw_member_months = MemberMonths::uniform(0.0);
        assert_eq!(effective_weights(PeriodWeights::new(0.7, 0.3), &p), PeriodWeights::new(0.0, 1.0));

        let mut p = periods(10, 500.0);
        p.current.raw_member_months = MemberMonths::uniform(0.0);
        assert_eq!(effective_weights(PeriodWeights::new(0.75, 0.25), &p), PeriodWeights::current_only());
    }

    #[test]
    fn test_weighted_experience() {
        let projected = Periods::new(Figures::new(100.0, 50.0), Some(Figures::new(80.0, 40.0)));
        let w = weighted_experience(&projected, PeriodWeights::new(0.75, 0.25));
        assert_relative_eq!(w.medical(), 95.0);
        assert_relative_eq!(w.rx(), 47.5);
    }

    #[test]
    fn test_pooling_charge_variants() {
        let net = Figures::new(500.0, 200.0);
        assert_relative_eq!(pooling_charge(net, PoolingCharge::PercentOfNet(0.1)).total(), 70.0, epsilon = 1e-9);
        let fixed = pooling_charge(net, PoolingCharge::Pmpm { medical: 20.0, rx: 5.0 });
        assert_eq!(fixed, Figures::new(20.0, 5.0));
    }

    #[test]
    fn test_retention_split_by_blended() {
        let blended = Figures::new(750.0, 250.0);
        let flat = retention_pmpm(RetentionComponent::Pmpm(40.0), blended);
        assert_relative_eq!(flat.medical(), 30.0);
        assert_relative_eq!(flat.rx(), 10.0);

        let pct = retention_pmpm(RetentionComponent::PercentOfClaims(0.04), blended);
        assert_relative_eq!(pct.total(), 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rate_cap() {
        let premium = Figures::new(900.0, 300.0);
        let adj = rate_cap_adjustment(premium, 1_000.0, 0.15);
        assert_relative_eq!((premium + adj).total(), 1_150.0, epsilon = 1e-9);
        assert_eq!(rate_cap_adjustment(premium, 1_000.0, 0.25), Figures::zero());
    }

    #[test]
    fn test_claims_pmpm_zero_exposure() {
        let p = periods(12, 0.0);
        let mut sheet = CalculationSheet::new(Precision::default());
        let pmpm = claims_pmpm(&p.current, &mut sheet);
        assert_eq!(pmpm, Figures::zero());
        assert_eq!(sheet.warnings().len(), 2);
    }

    #[test]
    fn test_combined_factor_is_product() {
        let factors = vec![
            AdjustmentFactor::new("network", 0.98, 1.0),
            AdjustmentFactor::new("ibnr", 1.02, 1.01),
        ];
        let f = combined_factor(&factors);
        assert_relative_eq!(f.medical, 0.98 * 1.02, epsilon = 1e-12);
        assert_relative_eq!(f.rx, 1.01);
    }
}
