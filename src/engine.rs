//! Entry points for running renewals
//!
//! Single cases go through [`calculate_renewal`]; JSON requests, which may be
//! a single case or a BCBS multi-plan group, go through [`run`].
//!
//! # Example
//! ```ignore
//! let request = RenewalRequest::from_json(&std::fs::read_to_string("case.json")?)?;
//! let outcome = engine::run(request)?;
//! println!("{:.2}", outcome.final_premium_pmpm());
//! ```

use serde::{Deserialize, Serialize};

use crate::carriers::{compose, CarrierParameters, CompositeResult, PlanInput};
use crate::claims::{Carrier, UniversalInput};
use crate::error::{DataQualityWarning, RenewalError, Result};
use crate::rating::RenewalResult;

/// Rate one case with the given carrier's parameters
pub fn calculate_renewal(
    carrier: Carrier,
    input: &UniversalInput,
    parameters: CarrierParameters,
) -> Result<RenewalResult> {
    if parameters.carrier() != carrier {
        return Err(RenewalError::invalid_parameter(
            "carrier",
            format!("{} requested but {} parameters supplied", carrier, parameters.carrier()),
        ));
    }
    let calculator = parameters.into_calculator()?;
    calculator.calculate(input)
}

/// A renewal case file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenewalRequest {
    Single {
        input: UniversalInput,
        parameters: CarrierParameters,
    },
    MultiPlan {
        case_id: String,
        plans: Vec<PlanInput>,
    },
}

impl RenewalRequest {
    /// Parse a request; malformed or incomplete JSON is `InvalidParameters`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RenewalError::invalid_parameter("request", e.to_string()))
    }

    pub fn case_id(&self) -> &str {
        match self {
            RenewalRequest::Single { input, .. } => &input.case_id,
            RenewalRequest::MultiPlan { case_id, .. } => case_id,
        }
    }

    pub fn carrier(&self) -> Carrier {
        match self {
            RenewalRequest::Single { input, .. } => input.carrier,
            RenewalRequest::MultiPlan { .. } => Carrier::Bcbs,
        }
    }

    /// The case input of a single-case request
    pub fn single_input_mut(&mut self) -> Option<&mut UniversalInput> {
        match self {
            RenewalRequest::Single { input, .. } => Some(input),
            RenewalRequest::MultiPlan { .. } => None,
        }
    }
}

/// Result of a [`RenewalRequest`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenewalOutcome {
    Single(RenewalResult),
    MultiPlan(CompositeResult),
}

impl RenewalOutcome {
    pub fn case_id(&self) -> &str {
        match self {
            RenewalOutcome::Single(r) => &r.case_id,
            RenewalOutcome::MultiPlan(c) => &c.case_id,
        }
    }

    pub fn final_premium_pmpm(&self) -> f64 {
        match self {
            RenewalOutcome::Single(r) => r.final_premium_pmpm,
            RenewalOutcome::MultiPlan(c) => c.final_premium_pmpm,
        }
    }

    pub fn current_premium_pmpm(&self) -> f64 {
        match self {
            RenewalOutcome::Single(r) => r.current_premium_pmpm,
            RenewalOutcome::MultiPlan(c) => c.current_premium_pmpm,
        }
    }

    pub fn rate_change(&self) -> f64 {
        match self {
            RenewalOutcome::Single(r) => r.rate_change,
            RenewalOutcome::MultiPlan(c) => c.rate_change,
        }
    }

    /// Warnings from the outcome and, for composites, every plan
    pub fn warnings(&self) -> Vec<&DataQualityWarning> {
        match self {
            RenewalOutcome::Single(r) => r.data_quality.warnings.iter().collect(),
            RenewalOutcome::MultiPlan(c) => c
                .warnings
                .iter()
                .chain(c.plans.iter().flat_map(|p| p.result.data_quality.warnings.iter()))
                .collect(),
        }
    }
}

/// Run a single-case or multi-plan request
pub fn run(request: RenewalRequest) -> Result<RenewalOutcome> {
    log::debug!("running {} request {}", request.carrier(), request.case_id());
    match request {
        RenewalRequest::Single { input, parameters } => {
            calculate_renewal(input.carrier, &input, parameters).map(RenewalOutcome::Single)
        }
        RenewalRequest::MultiPlan { case_id, plans } => compose(&case_id, &plans).map(RenewalOutcome::MultiPlan),
    }
}
