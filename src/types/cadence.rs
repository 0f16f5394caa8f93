//! Aggregation cadence for wind-rose tables and the period keys derived
//! from it.

use chrono::{Datelike, NaiveDateTime};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the aggregator partitions observations into periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cadence {
    /// One frequency table per calendar year.
    Annual,
    /// One frequency table per calendar month.
    Monthly,
}

impl Cadence {
    /// The period an observation timestamp falls into under this cadence.
    pub fn period_of(&self, datetime: NaiveDateTime) -> Period {
        match self {
            Cadence::Annual => Period::Year(datetime.year()),
            Cadence::Monthly => Period::Month(datetime.year(), datetime.month()),
        }
    }

    pub(crate) fn file_suffix(&self) -> &'static str {
        match self {
            Cadence::Annual => "annual",
            Cadence::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_suffix())
    }
}

/// Error returned when parsing an unrecognized aggregation frequency.
#[derive(Debug, Clone, Error)]
#[error("unsupported aggregation frequency '{0}', expected 'annual' or 'monthly'")]
pub struct InvalidFrequency(pub String);

impl FromStr for Cadence {
    type Err = InvalidFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" => Ok(Cadence::Annual),
            "monthly" => Ok(Cadence::Monthly),
            other => Err(InvalidFrequency(other.to_string())),
        }
    }
}

/// One aggregation partition: a calendar year or a calendar month.
///
/// Periods order chronologically and format as `2024` / `2024-03`, which is
/// also the label used in output file names and the `period` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Year(i32),
    Month(i32, u32),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Year(y) => write!(f, "{y:04}"),
            Period::Month(y, m) => write!(f, "{y:04}-{m:02}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn annual_periods_split_on_year() {
        assert_eq!(Cadence::Annual.period_of(dt(2013, 12, 31, 23)), Period::Year(2013));
        assert_eq!(Cadence::Annual.period_of(dt(2014, 1, 1, 0)), Period::Year(2014));
    }

    #[test]
    fn monthly_periods_format_with_zero_padding() {
        let p = Cadence::Monthly.period_of(dt(2024, 3, 15, 6));
        assert_eq!(p, Period::Month(2024, 3));
        assert_eq!(p.to_string(), "2024-03");
    }

    #[test]
    fn periods_order_chronologically() {
        assert!(Period::Month(2023, 12) < Period::Month(2024, 1));
        assert!(Period::Year(2013) < Period::Year(2014));
    }

    #[test]
    fn parses_cadence_case_insensitively() {
        assert_eq!("Annual".parse::<Cadence>().unwrap(), Cadence::Annual);
        assert_eq!("monthly".parse::<Cadence>().unwrap(), Cadence::Monthly);
        assert!("weekly".parse::<Cadence>().is_err());
    }
}
