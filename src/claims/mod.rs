//! Claims experience records, shared value types, and CSV loading

mod data;
mod figures;
pub mod loader;

pub use data::{Carrier, LargeClaimant, ManualRates, MonthlyClaimsPoint, UniversalInput};
pub use figures::{round_to, FactorPair, Figures, MemberMonths, Periods};
pub use loader::{load_claimants, load_claims};
