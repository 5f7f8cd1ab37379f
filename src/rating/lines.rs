//! Audit lines and the sheet that sequences them

use serde::Serialize;

use crate::claims::{round_to, FactorPair, Figures, MemberMonths, Periods};
use crate::error::{guarded_divide, DataQualityWarning, RenewalError, WarningKind};
use super::parameters::Precision;

/// Value carried by one calculation line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineValue {
    /// Dollar or PMPM amounts
    Amount(Periods<Figures>),
    /// Medical/rx ratios
    Factor(Periods<FactorPair>),
    /// Member months, months of trend, weights, credibility, rate change
    Scalar(Periods<f64>),
    /// Single-period PMPM with its annual-dollar equivalent
    Dual { pmpm: Figures, annual: Figures },
}

impl LineValue {
    /// Every amount carried by the line
    pub fn figures(&self) -> Vec<Figures> {
        match self {
            LineValue::Amount(p) => std::iter::once(p.current).chain(p.prior).collect(),
            LineValue::Dual { pmpm, annual } => vec![*pmpm, *annual],
            LineValue::Factor(_) | LineValue::Scalar(_) => Vec::new(),
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            LineValue::Amount(_) | LineValue::Dual { .. } => self.figures().iter().all(Figures::is_finite),
            LineValue::Factor(p) => {
                std::iter::once(&p.current).chain(p.prior.as_ref()).all(|f| f.medical.is_finite() && f.rx.is_finite())
            }
            LineValue::Scalar(p) => p.current.is_finite() && p.prior.map_or(true, f64::is_finite),
        }
    }

    /// Current-period total for amount lines, the value itself for scalars
    pub fn current_total(&self) -> Option<f64> {
        match self {
            LineValue::Amount(p) => Some(p.current.total()),
            LineValue::Dual { pmpm, .. } => Some(pmpm.total()),
            LineValue::Scalar(p) => Some(p.current),
            LineValue::Factor(_) => None,
        }
    }
}

/// One numbered row of the audit table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationLine {
    pub number: u32,
    pub label: String,
    pub value: LineValue,
}

/// Append-only line sequencer
///
/// Numbers lines from 1 with no gaps, rounds amounts as they are recorded and
/// collects data-quality warnings raised along the way. Values handed back to
/// the caller are the recorded (rounded) values.
#[derive(Debug, Clone)]
pub struct CalculationSheet {
    lines: Vec<CalculationLine>,
    warnings: Vec<DataQualityWarning>,
    precision: Precision,
}

impl CalculationSheet {
    pub fn new(precision: Precision) -> Self {
        Self {
            lines: Vec::new(),
            warnings: Vec::new(),
            precision,
        }
    }

    fn round(&self, value: Figures) -> Figures {
        match self.precision.amount_decimals {
            Some(decimals) => value.rounded(decimals),
            None => value,
        }
    }

    /// Replace a non-finite amount with zero, leaving a warning behind
    fn sanitize(&mut self, label: &str, value: Figures) -> Figures {
        if value.is_finite() {
            return value;
        }
        self.warn(DataQualityWarning::new(
            WarningKind::DivisionGuard,
            format!("non-finite value in '{}' replaced with zero", label),
        ));
        Figures::zero()
    }

    fn push(&mut self, label: &str, value: LineValue) {
        let number = self.lines.len() as u32 + 1;
        log::trace!("line {:>2} {}: {:?}", number, label, value);
        self.lines.push(CalculationLine {
            number,
            label: label.to_string(),
            value,
        });
    }

    /// Record an amount line for both periods; returns the rounded values
    pub fn amounts(&mut self, label: &str, values: Periods<Figures>) -> Periods<Figures> {
        let current = self.sanitize(label, values.current);
        let prior = values.prior.map(|p| self.sanitize(label, p));
        let rounded = Periods::new(self.round(current), prior.map(|p| self.round(p)));
        self.push(label, LineValue::Amount(rounded));
        rounded
    }

    /// Record a current-only amount line
    pub fn amount(&mut self, label: &str, value: Figures) -> Figures {
        self.amounts(label, Periods::single(value)).current
    }

    pub fn factors(&mut self, label: &str, values: Periods<FactorPair>) -> Periods<FactorPair> {
        self.push(label, LineValue::Factor(values));
        values
    }

    pub fn factor(&mut self, label: &str, value: FactorPair) -> FactorPair {
        self.factors(label, Periods::single(value)).current
    }

    pub fn scalars(&mut self, label: &str, values: Periods<f64>) -> Periods<f64> {
        let clean = values.map(|v| if v.is_finite() { *v } else { 0.0 });
        self.push(label, LineValue::Scalar(clean));
        clean
    }

    pub fn scalar(&mut self, label: &str, value: f64) -> f64 {
        self.scalars(label, Periods::single(value)).current
    }

    /// Record a PMPM amount with its annual dollars (PMPM x member months)
    ///
    /// Returns the rounded PMPM; the annual column is derived from it.
    pub fn dual(&mut self, label: &str, pmpm: Figures, member_months: &MemberMonths) -> Figures {
        let pmpm = self.sanitize(label, pmpm);
        let pmpm = self.round(pmpm);
        let annual = Figures::new(pmpm.medical() * member_months.medical, pmpm.rx() * member_months.rx);
        let annual = self.sanitize(label, annual);
        let annual = self.round(annual);
        self.push(label, LineValue::Dual { pmpm, annual });
        pmpm
    }

    /// Guarded division; a zero denominator yields 0.0 and a warning
    pub fn divide(&mut self, numerator: f64, denominator: f64, quantity: &str) -> f64 {
        match guarded_divide(numerator, denominator, quantity) {
            Ok(value) => value,
            Err(err) => {
                self.recover(&err);
                0.0
            }
        }
    }

    /// Log a recoverable error and keep its warning
    pub fn recover(&mut self, err: &RenewalError) {
        if let Some(warning) = DataQualityWarning::recovered(err) {
            self.warn(warning);
        }
    }

    pub fn warn(&mut self, warning: DataQualityWarning) {
        log::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    /// Add warnings already logged upstream
    pub fn extend_warnings(&mut self, warnings: impl IntoIterator<Item = DataQualityWarning>) {
        self.warnings.extend(warnings);
    }

    pub fn lines(&self) -> &[CalculationLine] {
        &self.lines
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Rounds a standalone amount with the sheet's precision
    pub fn round_amount(&self, value: f64) -> f64 {
        match self.precision.amount_decimals {
            Some(decimals) => round_to(value, decimals),
            None => value,
        }
    }

    pub fn finish(self) -> (Vec<CalculationLine>, Vec<DataQualityWarning>) {
        (self.lines, self.warnings)
    }
}
