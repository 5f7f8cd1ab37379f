//! Large-claimant pooling
//!
//! Each claimant is assigned to the experience period whose date range
//! contains its incurred date. Only the part of a claimant's cost above the
//! pooling threshold is removed from experience. Partial-year periods scale
//! claimant amounts by the period's annualization factor before the threshold
//! comparison, so both sides of the comparison are on the same basis.

use serde::{Deserialize, Serialize};

use super::period::ExperiencePeriod;
use crate::claims::{Figures, LargeClaimant, Periods};
use crate::error::{guarded_divide, DataQualityWarning, RenewalError, Result, WarningKind};

/// Tolerance when checking a reported total against medical + rx
const TOTAL_TOLERANCE: f64 = 0.01;

/// What to do with a claimant record that fails validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimantPolicy {
    /// Abort the calculation with `InvalidClaimant`
    #[default]
    Reject,
    /// Drop the record and record a data-quality warning
    DropWithWarning,
}

/// A claimant that fell inside the period, after annualization
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PooledClaimant {
    pub claimant_id: String,
    pub incurred_date: chrono::NaiveDate,
    pub diagnosis: Option<String>,

    /// Claimant cost on the period's (possibly annualized) basis
    pub amount: Figures,

    /// Portion above the pooling threshold
    pub excess: Figures,
}

/// Result of pooling one period's large claimants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolingOutcome {
    pub threshold: f64,

    /// Total dollars above the threshold
    pub excess: Figures,

    /// Excess dollars per member month
    pub poolable_pmpm: Figures,

    /// Every claimant associated with the period, pooled or not
    pub claimants: Vec<PooledClaimant>,

    pub warnings: Vec<DataQualityWarning>,
}

impl PoolingOutcome {
    pub fn pooled_count(&self) -> usize {
        self.claimants.iter().filter(|c| c.excess.total() > 0.0).count()
    }
}

/// Validated medical/rx split of a claimant record
fn claimant_amounts(claimant: &LargeClaimant) -> Result<Figures> {
    let id = claimant.claimant_id.trim();

    for (name, value) in [
        ("total", claimant.total_amount),
        ("medical", claimant.medical_amount),
        ("rx", claimant.rx_amount),
    ] {
        if let Some(v) = value {
            if v < 0.0 || !v.is_finite() {
                return Err(RenewalError::invalid_claimant(id, format!("{} amount {} is negative or not finite", name, v)));
            }
        }
    }

    match (claimant.total_amount, claimant.medical_amount, claimant.rx_amount) {
        (Some(total), Some(medical), Some(rx)) => {
            if (medical + rx - total).abs() > TOTAL_TOLERANCE {
                return Err(RenewalError::invalid_claimant(
                    id,
                    format!("total {:.2} does not equal medical {:.2} + rx {:.2}", total, medical, rx),
                ));
            }
            Ok(Figures::new(medical, rx))
        }
        (None, Some(medical), Some(rx)) => Ok(Figures::new(medical, rx)),
        (Some(total), Some(medical), None) => {
            if total - medical < -TOTAL_TOLERANCE {
                return Err(RenewalError::invalid_claimant(
                    id,
                    format!("medical {:.2} exceeds total {:.2}", medical, total),
                ));
            }
            Ok(Figures::new(medical, (total - medical).max(0.0)))
        }
        (Some(total), None, Some(rx)) => {
            if total - rx < -TOTAL_TOLERANCE {
                return Err(RenewalError::invalid_claimant(id, format!("rx {:.2} exceeds total {:.2}", rx, total)));
            }
            Ok(Figures::new((total - rx).max(0.0), rx))
        }
        (Some(total), None, None) => Ok(Figures::new(total, 0.0)),
        _ => Err(RenewalError::invalid_claimant(id, "missing total amount")),
    }
}

/// Pool the claimants that belong to `period` against `threshold`
pub fn process(
    claimants: &[LargeClaimant],
    threshold: f64,
    period: &ExperiencePeriod,
    policy: ClaimantPolicy,
) -> Result<PoolingOutcome> {
    let mut outcome = PoolingOutcome {
        threshold,
        excess: Figures::zero(),
        poolable_pmpm: Figures::zero(),
        claimants: Vec::new(),
        warnings: Vec::new(),
    };

    for claimant in claimants.iter().filter(|c| period.contains(c.incurred_date)) {
        if !claimant.has_identifier() && !claimant.has_amounts() {
            outcome.warnings.push(DataQualityWarning::new(
                WarningKind::ClaimantDropped,
                format!("blank large-claimant row dated {} ignored", claimant.incurred_date),
            ));
            continue;
        }

        let amounts = match claimant_amounts(claimant) {
            Ok(amounts) => amounts,
            Err(err) if !claimant.has_identifier() || policy == ClaimantPolicy::DropWithWarning => {
                log::warn!("dropping large claimant: {}", err);
                outcome.warnings.extend(DataQualityWarning::recovered(&err));
                continue;
            }
            Err(err) => return Err(err),
        };

        let annualized = amounts.scale(period.annualization_factor);
        let excess_total = (annualized.total() - threshold).max(0.0);
        let excess = annualized.allocate(excess_total);

        outcome.excess += excess;
        outcome.claimants.push(PooledClaimant {
            claimant_id: if claimant.has_identifier() {
                claimant.claimant_id.trim().to_string()
            } else {
                "unidentified".to_string()
            },
            incurred_date: claimant.incurred_date,
            diagnosis: claimant.diagnosis.clone(),
            amount: annualized,
            excess,
        });
    }

    if outcome.excess.total() > 0.0 {
        let mm = &period.member_months;
        let medical = guarded_divide(outcome.excess.medical(), mm.medical, "pooled medical PMPM");
        let rx = guarded_divide(outcome.excess.rx(), mm.rx, "pooled rx PMPM");
        let medical = recover(medical, &mut outcome.warnings);
        let rx = recover(rx, &mut outcome.warnings);
        outcome.poolable_pmpm = Figures::new(medical, rx);
    }

    log::debug!(
        "{:?} period: {} claimants, {} above {:.0}, excess {:.2}",
        period.kind,
        outcome.claimants.len(),
        outcome.pooled_count(),
        threshold,
        outcome.excess.total()
    );

    Ok(outcome)
}

/// Warning for claimant records dated outside every period in `periods`
///
/// Blank rows are not counted; they carry nothing to pool.
pub fn unassigned_claimants(
    claimants: &[LargeClaimant],
    periods: &Periods<ExperiencePeriod>,
) -> Option<DataQualityWarning> {
    let outside: Vec<&str> = claimants
        .iter()
        .filter(|c| c.has_identifier() || c.has_amounts())
        .filter(|c| {
            !periods.current.contains(c.incurred_date)
                && !periods.prior.as_ref().map_or(false, |p| p.contains(c.incurred_date))
        })
        .map(|c| c.claimant_id.trim())
        .collect();
    if outside.is_empty() {
        return None;
    }
    log::debug!("{} large claimants outside the rated periods", outside.len());
    Some(DataQualityWarning::new(
        WarningKind::ClaimantOutsidePeriods,
        format!(
            "{} large claimant(s) dated outside the rated experience periods ignored: {}",
            outside.len(),
            outside.join(", ")
        ),
    ))
}

fn recover(value: Result<f64>, warnings: &mut Vec<DataQualityWarning>) -> f64 {
    value.unwrap_or_else(|err| {
        log::warn!("{}", err);
        warnings.extend(DataQualityWarning::recovered(&err));
        0.0
    })
}
