//! Period normalization
//!
//! Reshapes a monthly experience series of any length into a twelve-month
//! current period and, when history allows, a prior period:
//!
//! | months  | current                 | prior                    |
//! |---------|-------------------------|--------------------------|
//! | 24+     | latest 12               | the 12 before that       |
//! | 13-23   | latest 12               | the remaining 1-11 (raw) |
//! | 4-12    | all, annualized by 12/n | none                     |
//! | < 4     | `InsufficientData`      |                          |

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::claims::{Figures, MemberMonths, MonthlyClaimsPoint, Periods};
use crate::error::{DataQualityWarning, RenewalError, Result, WarningKind};

/// Shortest usable history
pub const MIN_HISTORY_MONTHS: usize = 4;

/// Months in a full experience period
pub const PERIOD_MONTHS: usize = 12;

/// Average days per month, for converting date spans to months
pub const DAYS_PER_MONTH: f64 = 365.25 / 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Current,
    Prior,
}

/// Aggregated experience for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperiencePeriod {
    pub kind: PeriodKind,

    /// First day of the first month
    pub start: NaiveDate,

    /// Last day of the last month
    pub end: NaiveDate,

    /// Months of data in the period
    pub months: usize,

    /// Member months as reported (never annualized)
    pub raw_member_months: MemberMonths,

    /// 12 / months for an annualized period, 1.0 otherwise
    pub annualization_factor: f64,

    /// Annualized-equivalent member months
    pub member_months: MemberMonths,

    /// Annualized-equivalent claims
    pub claims: Figures,
}

impl ExperiencePeriod {
    fn aggregate(kind: PeriodKind, points: &[MonthlyClaimsPoint], annualization_factor: f64) -> Self {
        let raw_member_months = points
            .iter()
            .fold(MemberMonths::default(), |acc, p| acc + p.exposure());
        let claims = points
            .iter()
            .fold(Figures::zero(), |acc, p| acc + p.claims());

        // Callers never pass an empty slice
        let start = month_start(points[0].month);
        let end = month_end(points[points.len() - 1].month);

        Self {
            kind,
            start,
            end,
            months: points.len(),
            raw_member_months,
            annualization_factor,
            member_months: raw_member_months.scale(annualization_factor),
            claims: claims.scale(annualization_factor),
        }
    }

    pub fn is_annualized(&self) -> bool {
        self.annualization_factor != 1.0
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Midpoint of the period's calendar span
    pub fn midpoint(&self) -> NaiveDate {
        midpoint(self.start, self.end)
    }
}

/// Split a monthly series into current and prior experience periods
pub fn normalize(series: &[MonthlyClaimsPoint]) -> Result<Periods<ExperiencePeriod>> {
    let n = series.len();
    if n < MIN_HISTORY_MONTHS {
        return Err(RenewalError::InsufficientData {
            available: n,
            required: MIN_HISTORY_MONTHS,
        });
    }

    let periods = if n >= 2 * PERIOD_MONTHS {
        let recent = &series[n - 2 * PERIOD_MONTHS..];
        let (prior, current) = recent.split_at(PERIOD_MONTHS);
        if n > 2 * PERIOD_MONTHS {
            log::debug!("ignoring {} months older than the prior period", n - 2 * PERIOD_MONTHS);
        }
        Periods::new(
            ExperiencePeriod::aggregate(PeriodKind::Current, current, 1.0),
            Some(ExperiencePeriod::aggregate(PeriodKind::Prior, prior, 1.0)),
        )
    } else if n > PERIOD_MONTHS {
        let (prior, current) = series.split_at(n - PERIOD_MONTHS);
        Periods::new(
            ExperiencePeriod::aggregate(PeriodKind::Current, current, 1.0),
            Some(ExperiencePeriod::aggregate(PeriodKind::Prior, prior, 1.0)),
        )
    } else {
        let factor = PERIOD_MONTHS as f64 / n as f64;
        Periods::single(ExperiencePeriod::aggregate(PeriodKind::Current, series, factor))
    };

    log::debug!(
        "normalized {} months: current {} months, prior {} months",
        n,
        periods.current.months,
        periods.prior.as_ref().map(|p| p.months).unwrap_or(0)
    );

    Ok(periods)
}

/// Warnings describing how the series was reshaped
pub fn normalization_warnings(
    series: &[MonthlyClaimsPoint],
    periods: &Periods<ExperiencePeriod>,
) -> Vec<DataQualityWarning> {
    let mut warnings = Vec::new();

    if series.windows(2).any(|w| w[1].month <= w[0].month) {
        warnings.push(DataQualityWarning::new(
            WarningKind::UnorderedMonths,
            "month labels are not strictly increasing; series order was used as given",
        ));
    }

    if periods.current.is_annualized() {
        warnings.push(DataQualityWarning::new(
            WarningKind::Annualized,
            format!(
                "current period annualized from {} months (factor {:.4})",
                periods.current.months, periods.current.annualization_factor
            ),
        ));
    }

    if let Some(prior) = &periods.prior {
        if prior.months < PERIOD_MONTHS {
            warnings.push(DataQualityWarning::new(
                WarningKind::ShortPriorPeriod,
                format!("prior period has {} of {} months", prior.months, PERIOD_MONTHS),
            ));
        }
    }

    warnings
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

pub fn midpoint(start: NaiveDate, end: NaiveDate) -> NaiveDate {
    start + chrono::Duration::days((end - start).num_days() / 2)
}

/// Fractional months from `from` to `to` (negative when `to` is earlier)
pub fn months_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_MONTH
}
