//! Monthly archive periods.
//!
//! Archives are organized by calendar month; build ranges are given on the
//! command line as inclusive `YYYY/MM` bounds, and archive files carry a
//! `YYYY-MM` tag in their stem.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{EngineError, Result};

static MONTH_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})").unwrap());

/// One calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::Config(format!(
                "month out of range in {year}/{month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Parse the CLI form `YYYY/MM`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid =
            || EngineError::Config(format!("invalid month \"{text}\" (expected YYYY/MM)"));
        let (year, month) = text.split_once('/').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }

    /// Extract the `YYYY-MM` tag from an archive file stem, if present.
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        let captures = MONTH_TAG.captures_iter(stem).last()?;
        let year: i32 = captures[1].parse().ok()?;
        let month: u32 = captures[2].parse().ok()?;
        Self::new(year, month).ok()
    }

    fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:02}", self.year, self.month)
    }
}

/// Inclusive range of months.
#[derive(Debug, Clone, Copy)]
pub struct MonthRange {
    pub first: Month,
    pub last: Month,
}

impl MonthRange {
    pub fn new(first: Month, last: Month) -> Result<Self> {
        if first > last {
            return Err(EngineError::Config(format!(
                "first month {first} is after last month {last}"
            )));
        }
        Ok(Self { first, last })
    }

    pub fn parse(first: &str, last: &str) -> Result<Self> {
        Self::new(Month::parse(first)?, Month::parse(last)?)
    }

    pub fn contains(&self, month: Month) -> bool {
        self.first <= month && month <= self.last
    }

    /// Iterate the months of the range in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = Month> {
        let last = self.last;
        let mut next = Some(self.first);
        std::iter::from_fn(move || {
            let current = next?;
            next = (current < last).then(|| current.succ());
            Some(current)
        })
    }
}
