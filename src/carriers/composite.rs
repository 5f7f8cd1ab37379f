//! BCBS multi-plan composite
//!
//! Each plan is rated on its own parameters and experience, then the plan
//! renewals are averaged by enrollment into one composite rate action. Every
//! plan result is kept for audit, including plans with no enrollment.

use serde::{Deserialize, Serialize};

use crate::claims::UniversalInput;
use crate::error::{guarded_divide, DataQualityWarning, RenewalError, Result, WarningKind};
use crate::rating::RenewalResult;
use super::bcbs::{BcbsCalculator, BcbsParameters};
use super::CarrierCalculator;

/// One plan of a multi-plan BCBS group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInput {
    pub plan_id: String,

    /// Enrolled members (or subscribers) used as the composite weight
    pub enrollment: f64,

    pub input: UniversalInput,

    pub parameters: BcbsParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanResult {
    pub plan_id: String,
    pub enrollment: f64,
    pub result: RenewalResult,
}

impl PlanResult {
    /// Whether the plan carries composite weight
    pub fn is_weighted(&self) -> bool {
        self.enrollment > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeResult {
    pub case_id: String,

    /// Plan renewals in input order
    pub plans: Vec<PlanResult>,

    /// Enrollment-weighted renewal premium PMPM
    pub final_premium_pmpm: f64,

    /// Enrollment-weighted premium in force
    pub current_premium_pmpm: f64,

    pub rate_change: f64,

    /// Enrollment of the weighted plans
    pub total_enrollment: f64,

    pub warnings: Vec<DataQualityWarning>,
}

/// Rate every plan and combine them by enrollment
pub fn compose(case_id: &str, plans: &[PlanInput]) -> Result<CompositeResult> {
    if plans.is_empty() {
        return Err(RenewalError::invalid_parameter("plans", "at least one plan is required"));
    }
    for plan in plans {
        if !plan.enrollment.is_finite() || plan.enrollment < 0.0 {
            return Err(RenewalError::invalid_parameter(
                format!("plans.{}.enrollment", plan.plan_id),
                format!("must be non-negative, got {}", plan.enrollment),
            ));
        }
    }

    let mut results = Vec::with_capacity(plans.len());
    let mut warnings = Vec::new();
    for plan in plans {
        log::debug!("{}: rating plan {} ({} enrolled)", case_id, plan.plan_id, plan.enrollment);
        let calculator = BcbsCalculator::new(plan.parameters.clone())?;
        let result = calculator.calculate(&plan.input)?;

        if plan.enrollment == 0.0 {
            let warning = DataQualityWarning::new(
                WarningKind::ZeroEnrollment,
                format!("plan {} has no enrollment and is excluded from the composite", plan.plan_id),
            );
            log::warn!("{}: {}", case_id, warning.message);
            warnings.push(warning);
        }

        results.push(PlanResult {
            plan_id: plan.plan_id.clone(),
            enrollment: plan.enrollment,
            result,
        });
    }

    let weighted: Vec<&PlanResult> = results.iter().filter(|p| p.is_weighted()).collect();
    let total_enrollment: f64 = weighted.iter().map(|p| p.enrollment).sum();
    if total_enrollment <= 0.0 {
        return Err(RenewalError::invalid_parameter("plans", "no plan has positive enrollment"));
    }

    let weighted_sum = |value: fn(&RenewalResult) -> f64| -> f64 {
        weighted.iter().map(|p| value(&p.result) * p.enrollment).sum::<f64>() / total_enrollment
    };
    let final_premium_pmpm = weighted_sum(|r| r.final_premium_pmpm);
    let current_premium_pmpm = weighted_sum(|r| r.current_premium_pmpm);

    let rate_change = match guarded_divide(
        final_premium_pmpm - current_premium_pmpm,
        current_premium_pmpm,
        "composite rate change",
    ) {
        Ok(change) => change,
        Err(err) => {
            log::warn!("{}: {}", case_id, err);
            warnings.extend(DataQualityWarning::recovered(&err));
            0.0
        }
    };

    log::info!(
        "{}: composite of {} plans, {:.2} PMPM vs {:.2} current ({:+.2}%)",
        case_id,
        weighted.len(),
        final_premium_pmpm,
        current_premium_pmpm,
        rate_change * 100.0
    );

    Ok(CompositeResult {
        case_id: case_id.to_string(),
        plans: results,
        final_premium_pmpm,
        current_premium_pmpm,
        rate_change,
        total_enrollment,
        warnings,
    })
}
