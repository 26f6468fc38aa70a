//! Fiscal year (April–March), per Indian accounting convention.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A fiscal year identified by the calendar year it starts in.
///
/// The year runs 1 April through 31 March, so `FiscalYear(2024)` covers
/// 2024-04-01 ..= 2025-03-31. Voucher numbering sequences are partitioned
/// by this value and restart every April.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalYear(i32);

impl FiscalYear {
    /// Fiscal year containing `date`. January–March count toward the year
    /// that started the previous April.
    pub fn containing(date: NaiveDate) -> Self {
        let start = if date.month() >= 4 {
            date.year()
        } else {
            date.year() - 1
        };
        Self(start)
    }

    pub fn start_year(&self) -> i32 {
        self.0
    }

    /// First day of the fiscal year (1 April).
    pub fn start_date(&self) -> NaiveDate {
        // 1 April always exists.
        NaiveDate::from_ymd_opt(self.0, 4, 1).unwrap()
    }

    /// Last day of the fiscal year (31 March of the following year).
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 + 1, 3, 31).unwrap()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }
}

impl core::fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Rendered as "2024-25".
        write!(f, "{}-{:02}", self.0, (self.0 + 1) % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn april_first_starts_a_new_year() {
        assert_eq!(FiscalYear::containing(d(2025, 3, 31)), FiscalYear(2024));
        assert_eq!(FiscalYear::containing(d(2025, 4, 1)), FiscalYear(2025));
    }

    #[test]
    fn january_counts_toward_previous_april() {
        assert_eq!(FiscalYear::containing(d(2026, 1, 15)), FiscalYear(2025));
    }

    #[test]
    fn bounds_are_inclusive() {
        let fy = FiscalYear::containing(d(2024, 7, 1));
        assert_eq!(fy.start_date(), d(2024, 4, 1));
        assert_eq!(fy.end_date(), d(2025, 3, 31));
        assert!(fy.contains(fy.start_date()));
        assert!(fy.contains(fy.end_date()));
        assert!(!fy.contains(d(2025, 4, 1)));
    }

    #[test]
    fn display_uses_short_second_year() {
        assert_eq!(FiscalYear(2024).to_string(), "2024-25");
        assert_eq!(FiscalYear(1999).to_string(), "1999-00");
    }
}
