//! The main entry point for running the wind pipeline from code: select
//! stations, download their observations and optionally merge the result
//! into one dataset.

use crate::config::DownloadSpec;
use crate::error::WindAtlasError;
use crate::fetch::downloader::{FetchReport, WindDownloader};
use crate::merge::{merge_station_files, MergeSummary};
use crate::stations::station_index::{Coverage, StationFilter, StationIndex};
use crate::types::bounding_box::BoundingBox;
use crate::types::interval::Interval;
use crate::types::station::Station;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task;

/// Outcome of a [`WindAtlas::download`] run.
#[derive(Debug)]
pub struct DownloadReport {
    /// Per-station fetch outcome.
    pub fetch: FetchReport,
    /// Merge outcome, when merging was requested.
    pub merged: Option<MergeSummary>,
}

/// The pipeline client.
///
/// Holds the station index (backed by a cached copy of the station
/// metadata dump) and the observation downloader. Create one with
/// [`WindAtlas::new()`] for the default cache directory or
/// [`WindAtlas::with_cache_folder()`] to control where the station dump is
/// cached.
///
/// # Examples
///
/// ```no_run
/// # use wind_atlas::{WindAtlas, WindAtlasError};
/// # async fn run() -> Result<(), WindAtlasError> {
/// let atlas = WindAtlas::new().await?;
/// # Ok(())
/// # }
/// ```
pub struct WindAtlas {
    index: StationIndex,
    downloader: WindDownloader,
}

#[bon]
impl WindAtlas {
    /// Creates a client with a specific cache directory for the station
    /// dump. The directory is created if it does not exist.
    pub async fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, WindAtlasError> {
        ensure_cache_dir_exists(&cache_folder).await?;
        Ok(Self {
            index: StationIndex::new(&cache_folder).await?,
            downloader: WindDownloader::new(),
        })
    }

    /// Creates a client using the default cache directory (the platform
    /// cache dir, e.g. `~/.cache/wind_atlas_cache` on Linux).
    pub async fn new() -> Result<Self, WindAtlasError> {
        let cache_folder = get_cache_dir()?;
        Self::with_cache_folder(cache_folder).await
    }

    #[cfg(test)]
    pub(crate) fn from_parts(index: StationIndex, downloader: WindDownloader) -> Self {
        Self { index, downloader }
    }

    /// Lists stations matching the given filters, sorted by station id.
    ///
    /// # Arguments
    ///
    /// * `.region(String)`: Optional ISO country code (e.g. `"KR"`).
    /// * `.bbox(BoundingBox)`: Optional geographical bounding box.
    /// * `.limit(usize)`: Optional cap on the number of stations.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use wind_atlas::{WindAtlas, WindAtlasError};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), WindAtlasError> {
    /// let atlas = WindAtlas::new().await?;
    /// let stations = atlas
    ///     .find_stations()
    ///     .region("KR".to_string())
    ///     .limit(10)
    ///     .call()
    ///     .await?;
    /// println!("{} Korean stations", stations.len());
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn find_stations(
        &self,
        region: Option<String>,
        bbox: Option<BoundingBox>,
        limit: Option<usize>,
    ) -> Result<Vec<Station>, WindAtlasError> {
        let filter = StationFilter {
            region,
            bbox,
            limit,
            coverage: None,
        };
        Ok(self.index.query(&filter))
    }

    /// Downloads wind observations for every matching station, writing one
    /// CSV per station (plus a manifest) into `out_dir`, and optionally
    /// merges them into a single dataset.
    ///
    /// Stations whose reported inventory has no overlap with
    /// `[start, end]` are skipped up front. Per-station failures are
    /// retried with backoff and reported rather than aborting the run; the
    /// run fails only when no station at all yields data.
    ///
    /// # Arguments
    ///
    /// * `.start(NaiveDate)` / `.end(NaiveDate)`: **Required.** Inclusive
    ///   date range (UTC).
    /// * `.out_dir(PathBuf)`: **Required.** Output directory.
    /// * `.interval(Interval)`: Optional granularity, default hourly.
    /// * `.region(String)` / `.bbox(BoundingBox)` / `.limit(usize)`:
    ///   Optional station filters.
    /// * `.merge(bool)`: Optional, default `false`; write the unified
    ///   dataset after fetching.
    /// * `.deadline(Duration)`: Optional wall-clock limit for the fetch
    ///   stage; a long pull over many stations fails rather than running
    ///   unbounded.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use wind_atlas::{WindAtlas, WindAtlasError, Interval};
    /// # use chrono::NaiveDate;
    /// # use std::path::PathBuf;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), WindAtlasError> {
    /// let atlas = WindAtlas::new().await?;
    /// let report = atlas
    ///     .download()
    ///     .start(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    ///     .end(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
    ///     .interval(Interval::Hourly)
    ///     .region("KR".to_string())
    ///     .limit(25)
    ///     .out_dir(PathBuf::from("output"))
    ///     .merge(true)
    ///     .call()
    ///     .await?;
    /// println!(
    ///     "{} stations fetched, {} rows",
    ///     report.fetch.fetched.len(),
    ///     report.fetch.rows_total()
    /// );
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub async fn download(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        out_dir: PathBuf,
        interval: Option<Interval>,
        region: Option<String>,
        bbox: Option<BoundingBox>,
        limit: Option<usize>,
        merge: Option<bool>,
        deadline: Option<Duration>,
    ) -> Result<DownloadReport, WindAtlasError> {
        let spec = DownloadSpec {
            start,
            end,
            interval: interval.unwrap_or(Interval::Hourly),
            region,
            bbox,
            limit,
            out_dir,
            merge: merge.unwrap_or(false),
            deadline,
        };
        spec.validate()?;

        let stations = self.index.query(&StationFilter {
            region: spec.region.clone(),
            bbox: spec.bbox,
            limit: spec.limit,
            coverage: Some(Coverage {
                interval: spec.interval,
                start: spec.start,
                end: spec.end,
            }),
        });
        if stations.is_empty() {
            return Err(WindAtlasError::NoStationsMatched);
        }

        let run = self
            .downloader
            .run(&stations, spec.interval, spec.start, spec.end, &spec.out_dir);
        let fetch = match spec.deadline {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| WindAtlasError::DeadlineExceeded(limit))??,
            None => run.await?,
        };
        if fetch.fetched.is_empty() {
            return Err(WindAtlasError::NoStationData {
                requested: fetch.requested,
            });
        }

        let merged = if spec.merge {
            let dir = spec.out_dir.clone();
            Some(task::spawn_blocking(move || merge_station_files(&dir)).await??)
        } else {
            None
        };

        Ok(DownloadReport { fetch, merged })
    }
}
