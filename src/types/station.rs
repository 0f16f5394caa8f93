//! Data structures for weather-station metadata as published in the bulk
//! station dump, plus the R-tree impl used for bounding-box queries.

use chrono::NaiveDate;
use rstar::{RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::interval::Interval;

/// A single weather station and its metadata.
///
/// Mirrors the fields of the upstream station dump (JSON): identity,
/// geographical location and reported data availability per granularity.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    /// The unique station identifier (e.g. "47108").
    pub id: String,
    /// ISO 3166-1 alpha-2 country code (e.g. "KR").
    pub country: String,
    /// Region code (state, province), if available.
    pub region: Option<String>,
    /// IANA timezone name for the station's location, if available.
    pub timezone: Option<String>,
    /// Station names keyed by language code (e.g. {"en": "Seoul"}).
    pub name: HashMap<String, String>,
    /// Other known identifiers for the station.
    pub identifiers: Identifiers,
    /// Latitude, longitude and elevation.
    pub location: Location,
    /// Reported data-availability ranges per granularity.
    pub inventory: Inventory,
}

impl Station {
    /// English name if present, otherwise any name, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.name
            .get("en")
            .or_else(|| self.name.values().next())
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Reported data-availability ranges for the granularities a station serves.
///
/// Gaps may exist within a reported range; the ranges are advisory, not a
/// guarantee that every datapoint exists.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Inventory {
    /// Reported start and end dates for daily data.
    pub daily: DateRange,
    /// Reported start and end dates for hourly data.
    pub hourly: DateRange,
    /// Reported start and end dates for model data (often mirrors hourly).
    pub model: DateRange,
    /// Reported start and end years for monthly data.
    pub monthly: YearRange,
    /// Reported start and end years for climate normals.
    pub normals: YearRange,
}

impl Inventory {
    /// Whether the station reports any data for `interval` overlapping the
    /// inclusive `[start, end]` date range.
    pub fn covers(&self, interval: Interval, start: NaiveDate, end: NaiveDate) -> bool {
        let range = match interval {
            Interval::Hourly => &self.hourly,
            Interval::Daily => &self.daily,
        };
        range.overlaps(start, end)
    }
}

/// A date range with optional start and end.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Whether this reported range overlaps the inclusive `[start, end]`.
    ///
    /// A range with neither bound set means no reported data. A missing
    /// bound on one side is treated as unbounded on that side.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        match (self.start, self.end) {
            (None, None) => false,
            (s, e) => {
                s.map_or(true, |reported_start| reported_start <= end)
                    && e.map_or(true, |reported_end| reported_end >= start)
            }
        }
    }
}

/// A year range with optional start and end years.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}

/// Alternative identifiers that may be associated with a station.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Identifiers {
    /// National station identifier, if available.
    pub national: Option<String>,
    /// WMO identifier, if available.
    pub wmo: Option<String>,
    /// ICAO airport code, if the station is at an airport.
    pub icao: Option<String>,
}

/// Geographical location of a station.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Location {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Elevation above sea level in meters, if available.
    pub elevation: Option<i32>,
}

/// Treats a `Station` as a point object in an R-tree, keyed by
/// (latitude, longitude), so that bounding-box queries are an envelope
/// lookup rather than a full scan.
impl RTreeObject for Station {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.location.latitude, self.location.longitude])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_range_never_overlaps() {
        let range = DateRange { start: None, end: None };
        assert!(!range.overlaps(date(2013, 1, 1), date(2013, 12, 31)));
    }

    #[test]
    fn bounded_range_overlap() {
        let range = DateRange {
            start: Some(date(2010, 1, 1)),
            end: Some(date(2012, 12, 31)),
        };
        assert!(range.overlaps(date(2012, 6, 1), date(2013, 6, 1)));
        assert!(!range.overlaps(date(2013, 1, 1), date(2013, 12, 31)));
    }

    #[test]
    fn open_ended_range_overlaps_future() {
        let range = DateRange {
            start: Some(date(2010, 1, 1)),
            end: None,
        };
        assert!(range.overlaps(date(2024, 1, 1), date(2024, 12, 31)));
        assert!(!range.overlaps(date(2000, 1, 1), date(2009, 12, 31)));
    }
}
