//! Coverage-gap inputs and the Hoffmann present-value calculation.

use serde::{Deserialize, Serialize};

/// Fixed annual discount rate.
pub const DISCOUNT_RATE: f64 = 0.05;

/// Results are reported in units of 10,000 KRW.
pub const UNIT_DIVISOR: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Coverage {
    pub annual_income: f64,
    /// 0..=100
    pub coverage_gap_percent: f64,
    pub years_remaining: f64,
    /// Derived from the three inputs above; never set directly.
    pub hoffmann_gap: i64,
}

impl Default for Coverage {
    fn default() -> Self {
        Self {
            annual_income: 0.0,
            coverage_gap_percent: 30.0,
            years_remaining: 30.0,
            hoffmann_gap: 0,
        }
    }
}

/// Partial update for [`Coverage`]. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoveragePatch {
    pub annual_income: Option<f64>,
    pub coverage_gap_percent: Option<f64>,
    pub years_remaining: Option<f64>,
}

impl CoveragePatch {
    pub fn is_empty(&self) -> bool {
        self.annual_income.is_none()
            && self.coverage_gap_percent.is_none()
            && self.years_remaining.is_none()
    }
}

impl Coverage {
    /// Merge `patch` and recompute the gap from the merged inputs.
    pub fn merged(&self, patch: &CoveragePatch) -> Self {
        let annual_income = patch.annual_income.unwrap_or(self.annual_income);
        let coverage_gap_percent = patch
            .coverage_gap_percent
            .unwrap_or(self.coverage_gap_percent);
        let years_remaining = patch.years_remaining.unwrap_or(self.years_remaining);
        Self {
            annual_income,
            coverage_gap_percent,
            years_remaining,
            hoffmann_gap: hoffmann_gap(annual_income, coverage_gap_percent, years_remaining),
        }
    }
}

/// Present value of the uncovered share of future income, in 10,000 KRW.
///
/// `pv = income * (1 - (1 + r)^-years) / r`, scaled by `percent / 100`,
/// divided by [`UNIT_DIVISOR`] and rounded. Zero, negative or NaN income or
/// years give 0; the percent is clamped to 0..=100.
pub fn hoffmann_gap(annual_income: f64, coverage_gap_percent: f64, years_remaining: f64) -> i64 {
    if !(annual_income > 0.0) || !(years_remaining > 0.0) {
        return 0;
    }
    let percent = if coverage_gap_percent.is_nan() {
        0.0
    } else {
        coverage_gap_percent.clamp(0.0, 100.0)
    };

    let annuity_factor = (1.0 - (1.0 + DISCOUNT_RATE).powf(-years_remaining)) / DISCOUNT_RATE;
    let pv = annual_income * annuity_factor;
    let gap = (pv * (percent / 100.0)) / UNIT_DIVISOR;
    if !gap.is_finite() {
        return 0;
    }
    gap.round() as i64
}
