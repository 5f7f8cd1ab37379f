//! Everything a carrier calculation needs before its first line
//!
//! Normalizes the claims series, pools large claimants per period, settles the
//! trend horizon and resolves which manual rates apply. Fatal problems surface
//! here, so no carrier ever starts a sheet it cannot finish.

use chrono::{Months, NaiveDate};

use crate::claims::{ManualRates, Periods, UniversalInput};
use crate::error::{DataQualityWarning, RenewalError, Result, WarningKind};
use crate::experience::period::{midpoint, months_between};
use crate::experience::large_claims::unassigned_claimants;
use crate::experience::{normalization_warnings, normalize, process, ExperiencePeriod, PoolingOutcome};
use super::parameters::{validate_manual_rates, PeriodWeights, RatingParameters, TrendAssumption};
use super::result::RenewalSummary;

/// Which experience periods a methodology rates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUse {
    CurrentAndPrior,
    CurrentOnly,
}

/// Prepared experience for one case
#[derive(Debug, Clone)]
pub struct RatingContext {
    pub periods: Periods<ExperiencePeriod>,
    pub pooling: Periods<PoolingOutcome>,
    pub trend_months: Periods<f64>,
    pub manual_rates: ManualRates,
    pub warnings: Vec<DataQualityWarning>,
}

impl RatingContext {
    pub fn prepare(input: &UniversalInput, rating: &RatingParameters, period_use: PeriodUse) -> Result<Self> {
        let mut periods = normalize(&input.claims)?;
        let mut warnings = normalization_warnings(&input.claims, &periods);

        if period_use == PeriodUse::CurrentOnly {
            if let Some(prior) = periods.prior.take() {
                warnings.push(DataQualityWarning::new(
                    WarningKind::PriorPeriodIgnored,
                    format!("{} months of prior experience not used by this methodology", prior.months),
                ));
            }
        }
        if !(periods.current.raw_member_months.total > 0.0) {
            let prior_usable = periods.prior.as_ref().map_or(false, |p| p.raw_member_months.total > 0.0);
            let message = if prior_usable {
                "current period has no member months; prior experience takes the full period weight"
            } else {
                "no experience period has member months; manual rates carry the blend"
            };
            warnings.push(DataQualityWarning::new(WarningKind::NoCurrentExposure, message));
        }
        warnings.extend(unassigned_claimants(&input.large_claimants, &periods));
        for warning in &warnings {
            log::warn!("{}: {}", input.case_id, warning.message);
        }

        let threshold = rating.pooling_threshold;
        let policy = rating.claimant_policy;
        let current = process(&input.large_claimants, threshold, &periods.current, policy)?;
        let prior = periods
            .prior
            .as_ref()
            .map(|p| process(&input.large_claimants, threshold, p, policy))
            .transpose()?;
        let pooling = Periods::new(current, prior);
        warnings.extend(pooling.current.warnings.iter().cloned());
        if let Some(prior) = &pooling.prior {
            warnings.extend(prior.warnings.iter().cloned());
        }

        let trend_months = trend_months(input, &rating.trend, &periods)?;

        let manual_rates = match input.manual_rates {
            Some(rates) => {
                validate_manual_rates(&rates, "manual_rates")?;
                rates
            }
            None => rating.credibility.manual_rates.ok_or_else(|| {
                RenewalError::invalid_parameter(
                    "credibility.manual_rates",
                    "no manual rates in the parameters or the case input",
                )
            })?,
        };

        log::debug!(
            "{}: prepared {} current months, {} prior months, trend {:.2} months",
            input.case_id,
            periods.current.months,
            periods.prior.as_ref().map(|p| p.months).unwrap_or(0),
            trend_months.current
        );

        Ok(Self {
            periods,
            pooling,
            trend_months,
            manual_rates,
            warnings,
        })
    }

    /// Raw member months of every period carrying weight
    pub fn credibility_member_months(&self, weights: PeriodWeights) -> f64 {
        let current = self.periods.current.raw_member_months.total;
        match &self.periods.prior {
            Some(prior) if weights.prior > 0.0 => current + prior.raw_member_months.total,
            _ => current,
        }
    }

    pub fn summary(&self) -> RenewalSummary {
        RenewalSummary {
            member_months: self.periods.map(|p| p.raw_member_months.total),
            months: self.periods.map(|p| p.months),
            annualized: self.periods.current.is_annualized(),
            trend_months: self.trend_months,
        }
    }
}

fn default_renewal_end(start: NaiveDate) -> Result<NaiveDate> {
    start
        .checked_add_months(Months::new(12))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| RenewalError::invalid_parameter("renewal_start", "date out of range"))
}

/// Months of trend per period
///
/// The current period trends from its midpoint to the renewal midpoint, either
/// as supplied or measured from the dates. The prior period adds the distance
/// between the two experience midpoints.
fn trend_months(
    input: &UniversalInput,
    trend: &TrendAssumption,
    periods: &Periods<ExperiencePeriod>,
) -> Result<Periods<f64>> {
    let renewal_end = match input.renewal_end {
        Some(end) => end,
        None => default_renewal_end(input.renewal_start)?,
    };
    if renewal_end <= input.renewal_start {
        return Err(RenewalError::invalid_parameter(
            "renewal_end",
            format!("{} is not after renewal start {}", renewal_end, input.renewal_start),
        ));
    }

    let experience_mid = periods.current.midpoint();
    let current = match trend.months_to_midpoint {
        Some(months) => months,
        None => {
            let months = months_between(experience_mid, midpoint(input.renewal_start, renewal_end));
            if months < 0.0 {
                return Err(RenewalError::invalid_parameter(
                    "renewal_start",
                    format!("renewal period precedes the experience midpoint {}", experience_mid),
                ));
            }
            months
        }
    };

    let prior = periods
        .prior
        .as_ref()
        .map(|p| current + months_between(p.midpoint(), experience_mid));

    Ok(Periods::new(current, prior))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{Carrier, LargeClaimant, MonthlyClaimsPoint};
    use crate::rating::parameters::tests::sample_rating;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(months: usize) -> UniversalInput {
        let first = date(2023, 1, 1);
        UniversalInput {
            carrier: Carrier::Aetna,
            case_id: "CASE-1".into(),
            claims: (0..months)
                .map(|i| {
                    let month = first.checked_add_months(Months::new(i as u32)).unwrap();
                    MonthlyClaimsPoint::new(month, 577.0, 331_000.0, 133_000.0)
                })
                .collect(),
            large_claimants: vec![LargeClaimant::new("LC-1", date(2024, 6, 3), 260_000.0, 15_000.0)],
            manual_rates: None,
            renewal_start: date(2025, 1, 1),
            renewal_end: None,
        }
    }

    #[test]
    fn test_prepare_two_periods() {
        let ctx = RatingContext::prepare(&input(24), &sample_rating(), PeriodUse::CurrentAndPrior).unwrap();
        assert!(ctx.periods.has_prior());
        assert_relative_eq!(ctx.pooling.current.excess.total(), 100_000.0);
        assert_eq!(ctx.pooling.prior.as_ref().unwrap().claimants.len(), 0);
        assert_eq!(ctx.trend_months.current, 19.0);
        // Prior midpoint sits twelve months earlier
        assert_relative_eq!(ctx.trend_months.prior.unwrap(), 19.0 + 365.0 / (365.25 / 12.0), epsilon = 1e-9);
        assert_eq!(ctx.manual_rates, ManualRates::new(637.22, 204.42));
    }

    #[test]
    fn test_current_only_drops_prior() {
        let ctx = RatingContext::prepare(&input(24), &sample_rating(), PeriodUse::CurrentOnly).unwrap();
        assert!(!ctx.periods.has_prior());
        assert!(ctx.pooling.prior.is_none());
        assert!(ctx.warnings.iter().any(|w| w.kind == WarningKind::PriorPeriodIgnored));
    }

    #[test]
    fn test_input_manual_rates_take_precedence() {
        let mut case = input(12);
        case.manual_rates = Some(ManualRates::new(700.0, 250.0));
        let ctx = RatingContext::prepare(&case, &sample_rating(), PeriodUse::CurrentAndPrior).unwrap();
        assert_eq!(ctx.manual_rates, ManualRates::new(700.0, 250.0));
    }

    #[test]
    fn test_missing_manual_rates() {
        let mut rating = sample_rating();
        rating.credibility.manual_rates = None;
        let err = RatingContext::prepare(&input(12), &rating, PeriodUse::CurrentAndPrior).unwrap_err();
        assert!(matches!(err, RenewalError::InvalidParameters { ref field, .. } if field == "credibility.manual_rates"));
    }

    #[test]
    fn test_trend_months_from_dates() {
        let mut rating = sample_rating();
        rating.trend.months_to_midpoint = None;
        let mut case = input(12);
        case.renewal_start = date(2024, 7, 1);
        case.renewal_end = Some(date(2025, 6, 30));

        // Experience 2023 midpoint July 2, renewal midpoint Dec 30 2024
        let ctx = RatingContext::prepare(&case, &rating, PeriodUse::CurrentAndPrior).unwrap();
        let expected = months_between(date(2023, 7, 2), date(2024, 12, 30));
        assert_relative_eq!(ctx.trend_months.current, expected);
        assert!(ctx.trend_months.current > 17.0 && ctx.trend_months.current < 19.0);
    }

    #[test]
    fn test_renewal_end_before_start() {
        let mut case = input(12);
        case.renewal_end = Some(date(2024, 12, 1));
        let err = RatingContext::prepare(&case, &sample_rating(), PeriodUse::CurrentAndPrior).unwrap_err();
        assert!(matches!(err, RenewalError::InvalidParameters { ref field, .. } if field == "renewal_end"));
    }

    #[test]
    fn test_credibility_exposure_uses_raw_member_months() {
        let ctx = RatingContext::prepare(&input(6), &sample_rating(), PeriodUse::CurrentAndPrior).unwrap();
        assert_relative_eq!(ctx.periods.current.member_months.total, 577.0 * 12.0);
        assert_relative_eq!(ctx.credibility_member_months(PeriodWeights::current_only()), 577.0 * 6.0);
    }
}
