//! Defines the granularity of raw observation downloads and the fixed
//! column layout of the upstream bulk CSV files.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The time granularity of raw observations fetched from the bulk endpoint.
///
/// Hourly data carries one row per station-hour, daily data one row per
/// station-day. The granularity determines both the download URL segment
/// and the expected CSV schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    /// One observation per hour.
    Hourly,
    /// One aggregated observation per day.
    Daily,
}

impl Interval {
    pub(crate) fn path_segment(&self) -> &'static str {
        match self {
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
        }
    }

    /// Column names of the headerless upstream CSV for this granularity.
    pub(crate) fn schema_column_names(&self) -> Vec<&'static str> {
        match self {
            Interval::Hourly => vec![
                "date", "hour", "temp", "dwpt", "rhum", "prcp", "snow", "wdir", "wspd", "wpgt",
                "pres", "tsun", "coco",
            ],
            Interval::Daily => vec![
                "date", "tavg", "tmin", "tmax", "prcp", "snow", "wdir", "wspd", "wpgt", "pres",
                "tsun",
            ],
        }
    }
}

/// Allows formatting an `Interval` variant using its `path_segment`.
///
/// # Examples
///
/// ```
/// use wind_atlas::Interval;
///
/// assert_eq!(format!("{}", Interval::Hourly), "hourly");
/// assert_eq!(Interval::Daily.to_string(), "daily");
/// ```
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// Error returned when parsing an unrecognized interval name.
#[derive(Debug, Clone, Error)]
#[error("unsupported interval '{0}', expected 'hourly' or 'daily'")]
pub struct InvalidInterval(pub String);

impl FromStr for Interval {
    type Err = InvalidInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(Interval::Hourly),
            "daily" => Ok(Interval::Daily),
            other => Err(InvalidInterval(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_intervals() {
        assert_eq!("hourly".parse::<Interval>().unwrap(), Interval::Hourly);
        assert_eq!("Daily".parse::<Interval>().unwrap(), Interval::Daily);
    }

    #[test]
    fn rejects_unknown_interval() {
        let err = "weekly".parse::<Interval>().unwrap_err();
        assert!(err.to_string().contains("weekly"));
    }

    #[test]
    fn hourly_schema_has_thirteen_columns() {
        assert_eq!(Interval::Hourly.schema_column_names().len(), 13);
        assert_eq!(Interval::Daily.schema_column_names().len(), 11);
    }
}
