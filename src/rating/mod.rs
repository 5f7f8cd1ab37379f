//! Shared rating machinery: parameters, audit lines, arithmetic steps and
//! the prepared per-case context every carrier starts from

pub mod parameters;
pub mod lines;
pub mod steps;
pub mod context;
pub mod result;

pub use parameters::{
    AdjustmentFactor, CredibilityFormula, CredibilityParameters, PeriodWeights, PoolingCharge, Precision,
    RatingParameters, RetentionComponent, RetentionLoad, TrendAssumption,
};
pub use lines::{CalculationLine, CalculationSheet, LineValue};
pub use context::{PeriodUse, RatingContext};
pub use result::{DataQuality, RenewalResult, RenewalSummary};
