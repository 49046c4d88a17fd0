//! Indemnity-insurance generation classifier.
//!
//! A policy's generation is decided by the month it was taken out. Each
//! generation carries different deductible and coverage rules, which is what
//! the agent explains to the customer.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static YEAR_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}$").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    #[default]
    Unset,
    Gen1,
    Gen2,
    Gen3,
    Gen4,
}

impl Generation {
    /// Human label shown in reports. `None` for `Unset`.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Generation::Unset => None,
            Generation::Gen1 => Some("1st generation (legacy indemnity)"),
            Generation::Gen2 => Some("2nd generation (standardized indemnity)"),
            Generation::Gen3 => Some("3rd generation (good-value indemnity)"),
            Generation::Gen4 => Some("4th generation indemnity"),
        }
    }

    pub fn is_set(&self) -> bool {
        *self != Generation::Unset
    }
}

// Last day (inclusive) of each generation.
fn upper_bounds() -> [(NaiveDate, Generation); 3] {
    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap_or(NaiveDate::MIN);
    [
        (d(2009, 9, 30), Generation::Gen1),
        (d(2017, 3, 31), Generation::Gen2),
        (d(2021, 6, 30), Generation::Gen3),
    ]
}

/// Classify a `YYYY-MM` enrollment month.
///
/// Total: anything that is not four digits, a dash and two digits, or whose
/// month is not 1..=12, is `Unset`. Day 28 stands in for the month so short
/// months never matter.
pub fn classify(year_month: &str) -> Generation {
    if !YEAR_MONTH.is_match(year_month) {
        return Generation::Unset;
    }
    let Some((y, m)) = year_month.split_once('-') else {
        return Generation::Unset;
    };
    let (Ok(year), Ok(month)) = (y.parse::<i32>(), m.parse::<u32>()) else {
        return Generation::Unset;
    };
    let Some(date) = NaiveDate::from_ymd_opt(year, month, 28) else {
        return Generation::Unset;
    };

    upper_bounds()
        .into_iter()
        .find(|(bound, _)| date <= *bound)
        .map(|(_, g)| g)
        .unwrap_or(Generation::Gen4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_months() {
        assert_eq!(classify("2009-09"), Generation::Gen1);
        assert_eq!(classify("2009-10"), Generation::Gen2);
        assert_eq!(classify("2017-03"), Generation::Gen2);
        assert_eq!(classify("2017-04"), Generation::Gen3);
        assert_eq!(classify("2021-06"), Generation::Gen3);
        assert_eq!(classify("2021-07"), Generation::Gen4);
    }

    #[test]
    fn far_past_and_future() {
        assert_eq!(classify("1990-01"), Generation::Gen1);
        assert_eq!(classify("2030-12"), Generation::Gen4);
    }

    #[test]
    fn malformed_input_is_unset() {
        for s in ["", "2020", "2020-1", "2020-001", "20-01-01", "2020/01", " 2020-01", "2020-01 ", "abcd-ef"] {
            assert_eq!(classify(s), Generation::Unset, "input {s:?}");
        }
    }

    #[test]
    fn out_of_range_month_is_unset() {
        assert_eq!(classify("2020-00"), Generation::Unset);
        assert_eq!(classify("2020-13"), Generation::Unset);
    }

    #[test]
    fn non_ascii_digits_are_rejected() {
        // Arabic-Indic digits would match a Unicode \d.
        assert_eq!(classify("٢٠٢٠-٠١"), Generation::Unset);
    }

    #[test]
    fn unset_has_no_label() {
        assert_eq!(Generation::Unset.label(), None);
        assert!(Generation::Gen3.label().unwrap().starts_with("3rd"));
    }
}
