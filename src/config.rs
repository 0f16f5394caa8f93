//! Validated run configurations for the pipeline stages.
//!
//! Every recognized option is an explicit struct field, checked eagerly
//! before any network or disk work starts.

use crate::types::bounding_box::{BoundingBox, BoundingBoxError};
use crate::types::cadence::Cadence;
use crate::types::interval::Interval;
use crate::types::speed_bins::{SpeedBins, SpeedBinsError};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Standard sea-level air density in kg/m³, the default for power-density
/// calculations.
pub const DEFAULT_AIR_DENSITY: f64 = 1.225;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("start date {start} is after end date {end}")]
    DateRangeOrder { start: NaiveDate, end: NaiveDate },

    #[error("station limit must be greater than zero")]
    ZeroLimit,

    #[error(transparent)]
    BoundingBox(#[from] BoundingBoxError),

    #[error(transparent)]
    SpeedBins(#[from] SpeedBinsError),

    #[error("air density must be positive, got {0}")]
    NonPositiveAirDensity(f64),
}

/// Options of one download run.
#[derive(Debug, Clone)]
pub struct DownloadSpec {
    /// First day of the requested range (inclusive, UTC).
    pub start: NaiveDate,
    /// Last day of the requested range (inclusive, UTC).
    pub end: NaiveDate,
    /// Observation granularity.
    pub interval: Interval,
    /// ISO country code filter; `None` selects all countries.
    pub region: Option<String>,
    /// Geographical bounding box filter.
    pub bbox: Option<BoundingBox>,
    /// Maximum number of stations; `None` selects all matching stations.
    pub limit: Option<usize>,
    /// Directory for per-station files and the manifest.
    pub out_dir: PathBuf,
    /// Whether to write the unified dataset after fetching.
    pub merge: bool,
    /// Overall wall-clock deadline for the fetch stage.
    pub deadline: Option<Duration>,
}

impl DownloadSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start > self.end {
            return Err(ConfigError::DateRangeOrder {
                start: self.start,
                end: self.end,
            });
        }
        if self.limit == Some(0) {
            return Err(ConfigError::ZeroLimit);
        }
        Ok(())
    }
}

/// Options of one aggregation run.
#[derive(Debug, Clone)]
pub struct RoseSpec {
    /// Path of the merged dataset.
    pub input: PathBuf,
    /// Directory for the frequency tables and the atlas summary.
    pub out_dir: PathBuf,
    /// Aggregation cadence.
    pub cadence: Cadence,
    /// Air density in kg/m³ for power-density statistics.
    pub rho: f64,
    /// Speed binning of the frequency tables.
    pub speed_bins: SpeedBins,
}

impl RoseSpec {
    /// A spec with default air density and speed bins.
    pub fn new(input: PathBuf, out_dir: PathBuf, cadence: Cadence) -> Self {
        Self {
            input,
            out_dir,
            cadence,
            rho: DEFAULT_AIR_DENSITY,
            speed_bins: SpeedBins::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rho.is_finite() && self.rho > 0.0) {
            return Err(ConfigError::NonPositiveAirDensity(self.rho));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn download_spec() -> DownloadSpec {
        DownloadSpec {
            start: date(2013, 1, 1),
            end: date(2013, 12, 31),
            interval: Interval::Hourly,
            region: Some("KR".to_string()),
            bbox: None,
            limit: Some(10),
            out_dir: PathBuf::from("output"),
            merge: true,
            deadline: None,
        }
    }

    #[test]
    fn accepts_valid_download_spec() {
        assert!(download_spec().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_date_range() {
        let mut spec = download_spec();
        spec.start = date(2014, 1, 1);
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::DateRangeOrder { .. })
        ));
    }

    #[test]
    fn rejects_zero_limit() {
        let mut spec = download_spec();
        spec.limit = Some(0);
        assert!(matches!(spec.validate(), Err(ConfigError::ZeroLimit)));
    }

    #[test]
    fn rejects_non_positive_air_density() {
        let mut spec = RoseSpec::new(
            PathBuf::from("in.csv"),
            PathBuf::from("atlas"),
            Cadence::Annual,
        );
        spec.rho = 0.0;
        assert!(matches!(
            spec.validate(),
            Err(ConfigError::NonPositiveAirDensity(_))
        ));
    }
}
