//! Carrier renewal methodologies
//!
//! Each carrier is a calculator built from its own validated parameter set.
//! They share the [`CarrierCalculator`] contract and the arithmetic in
//! [`crate::rating::steps`], but record lines in their own order.

pub mod aetna;
pub mod bcbs;
pub mod uhc;
pub mod cigna;
pub mod composite;
mod common;

use serde::{Deserialize, Serialize};

use crate::claims::{Carrier, UniversalInput};
use crate::error::{RenewalError, Result};
use crate::rating::RenewalResult;

pub use aetna::{AetnaCalculator, AetnaFactors, AetnaParameters};
pub use bcbs::{BcbsCalculator, BcbsParameters};
pub use uhc::{UhcCalculator, UhcParameters};
pub use cigna::{CignaCalculator, CignaParameters};
pub use composite::{compose, CompositeResult, PlanInput, PlanResult};

/// Shared contract for every carrier methodology
///
/// Calculators hold read-only parameters, so one instance may serve many
/// cases from many threads.
pub trait CarrierCalculator: Send + Sync {
    fn carrier(&self) -> Carrier;

    /// Run the full methodology for one case
    fn calculate(&self, input: &UniversalInput) -> Result<RenewalResult>;
}

/// Parameter set for any supported carrier, tagged by `carrier`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "carrier", rename_all = "snake_case")]
pub enum CarrierParameters {
    Aetna(AetnaParameters),
    Bcbs(BcbsParameters),
    #[serde(alias = "uhc")]
    UnitedHealthcare(UhcParameters),
    Cigna(CignaParameters),
}

impl CarrierParameters {
    pub fn carrier(&self) -> Carrier {
        match self {
            CarrierParameters::Aetna(_) => Carrier::Aetna,
            CarrierParameters::Bcbs(_) => Carrier::Bcbs,
            CarrierParameters::UnitedHealthcare(_) => Carrier::UnitedHealthcare,
            CarrierParameters::Cigna(_) => Carrier::Cigna,
        }
    }

    /// Parse a parameter set; malformed or incomplete JSON is `InvalidParameters`
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RenewalError::invalid_parameter("parameters", e.to_string()))
    }

    /// Validate and build the matching calculator
    pub fn into_calculator(self) -> Result<Box<dyn CarrierCalculator>> {
        Ok(match self {
            CarrierParameters::Aetna(p) => Box::new(AetnaCalculator::new(p)?),
            CarrierParameters::Bcbs(p) => Box::new(BcbsCalculator::new(p)?),
            CarrierParameters::UnitedHealthcare(p) => Box::new(UhcCalculator::new(p)?),
            CarrierParameters::Cigna(p) => Box::new(CignaCalculator::new(p)?),
        })
    }
}

/// Refuse input prepared for a different carrier
pub(crate) fn ensure_carrier(expected: Carrier, input: &UniversalInput) -> Result<()> {
    if input.carrier == expected {
        Ok(())
    } else {
        Err(RenewalError::invalid_parameter(
            "carrier",
            format!("{} parameters cannot rate {} input", expected, input.carrier),
        ))
    }
}
