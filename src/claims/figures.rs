//! Value types shared by every stage: medical/rx splits, ratio pairs,
//! member-month counts and current/prior period pairs

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

/// Medical (including capitation), rx and total amounts
///
/// `total` is always `medical + rx`; there is no way to set it independently.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Figures {
    medical: f64,
    rx: f64,
    total: f64,
}

impl Figures {
    pub fn new(medical: f64, rx: f64) -> Self {
        Self {
            medical,
            rx,
            total: medical + rx,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Medical plus capitation subtotal
    pub fn medical(&self) -> f64 {
        self.medical
    }

    pub fn rx(&self) -> f64 {
        self.rx
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Multiply both components by the same ratio
    pub fn scale(&self, ratio: f64) -> Self {
        Self::new(self.medical * ratio, self.rx * ratio)
    }

    /// Multiply medical and rx by their own ratios
    pub fn scale_by(&self, factor: FactorPair) -> Self {
        Self::new(self.medical * factor.medical, self.rx * factor.rx)
    }

    /// Spread a total amount across medical/rx in this value's proportions
    ///
    /// Everything lands on medical when this value has no total to split by.
    pub fn allocate(&self, amount: f64) -> Self {
        if self.total == 0.0 || !self.total.is_finite() {
            return Self::new(amount, 0.0);
        }
        let medical = amount * self.medical / self.total;
        Self::new(medical, amount - medical)
    }

    /// Round each component half away from zero; total follows from the parts
    pub fn rounded(&self, decimals: u32) -> Self {
        Self::new(round_to(self.medical, decimals), round_to(self.rx, decimals))
    }

    pub fn is_finite(&self) -> bool {
        self.medical.is_finite() && self.rx.is_finite()
    }
}

impl Add for Figures {
    type Output = Figures;

    fn add(self, other: Figures) -> Figures {
        Figures::new(self.medical + other.medical, self.rx + other.rx)
    }
}

impl AddAssign for Figures {
    fn add_assign(&mut self, other: Figures) {
        *self = *self + other;
    }
}

impl Sub for Figures {
    type Output = Figures;

    fn sub(self, other: Figures) -> Figures {
        Figures::new(self.medical - other.medical, self.rx - other.rx)
    }
}

/// Round half away from zero to a number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// Separate medical and rx ratios (trend factors, adjustment factors, rates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorPair {
    pub medical: f64,
    pub rx: f64,
}

impl FactorPair {
    pub fn new(medical: f64, rx: f64) -> Self {
        Self { medical, rx }
    }

    /// Same ratio for medical and rx
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value)
    }

    pub fn neutral() -> Self {
        Self::uniform(1.0)
    }
}

impl Default for FactorPair {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Member-month exposure, split where medical and rx enrollment differ
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MemberMonths {
    pub total: f64,
    pub medical: f64,
    pub rx: f64,
}

impl MemberMonths {
    /// Same count for every coverage
    pub fn uniform(total: f64) -> Self {
        Self {
            total,
            medical: total,
            rx: total,
        }
    }

    pub fn scale(&self, ratio: f64) -> Self {
        Self {
            total: self.total * ratio,
            medical: self.medical * ratio,
            rx: self.rx * ratio,
        }
    }
}

impl Add for MemberMonths {
    type Output = MemberMonths;

    fn add(self, other: MemberMonths) -> MemberMonths {
        MemberMonths {
            total: self.total + other.total,
            medical: self.medical + other.medical,
            rx: self.rx + other.rx,
        }
    }
}

/// A value for the current experience period and, when present, the prior one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Periods<T> {
    pub current: T,
    pub prior: Option<T>,
}

impl<T> Periods<T> {
    pub fn new(current: T, prior: Option<T>) -> Self {
        Self { current, prior }
    }

    pub fn single(current: T) -> Self {
        Self { current, prior: None }
    }

    pub fn has_prior(&self) -> bool {
        self.prior.is_some()
    }

    pub fn as_ref(&self) -> Periods<&T> {
        Periods {
            current: &self.current,
            prior: self.prior.as_ref(),
        }
    }

    /// Apply `f` to current first, then prior
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Periods<U> {
        let current = f(&self.current);
        let prior = self.prior.as_ref().map(f);
        Periods { current, prior }
    }

    /// Combine period-wise; the prior survives only when both sides have one
    pub fn zip_with<U, V>(&self, other: &Periods<U>, mut f: impl FnMut(&T, &U) -> V) -> Periods<V> {
        let current = f(&self.current, &other.current);
        let prior = match (&self.prior, &other.prior) {
            (Some(a), Some(b)) => Some(f(a, b)),
            _ => None,
        };
        Periods { current, prior }
    }
}
