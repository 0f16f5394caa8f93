use crate::fetch::error::FetchError;
use crate::fetch::observation_loader::ObservationLoader;
use crate::types::interval::Interval;
use crate::types::station::Station;
use chrono::NaiveDate;
use futures_util::{stream, StreamExt};
use log::{info, warn};
use polars::prelude::*;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;

/// Upper bound on download attempts per station.
pub const MAX_FETCH_ATTEMPTS: u32 = 4;

/// Number of stations fetched concurrently.
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// Per-request timeout applied to the HTTP client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Name of the station manifest written next to the per-station files.
pub const STATIONS_META_FILE_NAME: &str = "stations_meta.csv";

/// One successfully written per-station dataset.
#[derive(Debug)]
pub struct StationFile {
    pub station: String,
    pub rows: usize,
    pub path: PathBuf,
}

/// A station that failed after all retry attempts.
#[derive(Debug)]
pub struct StationFailure {
    pub station: String,
    pub error: FetchError,
}

/// Outcome of one download run.
///
/// Per-station failures are collected rather than propagated; the caller
/// decides whether an entirely empty run is fatal.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Stations selected for the run.
    pub requested: usize,
    /// Stations that produced a dataset file.
    pub fetched: Vec<StationFile>,
    /// Stations that returned no observations in the requested range.
    pub empty: Vec<String>,
    /// Stations that failed after retries.
    pub failed: Vec<StationFailure>,
}

impl FetchReport {
    /// Total observation rows written across all station files.
    pub fn rows_total(&self) -> usize {
        self.fetched.iter().map(|f| f.rows).sum()
    }
}

/// Fetches per-station wind observations with bounded concurrency and
/// retry-with-backoff, writing one CSV per station plus a manifest.
pub struct WindDownloader {
    loader: ObservationLoader,
}

impl WindDownloader {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            loader: ObservationLoader::new(client),
        }
    }

    /// Builds a downloader around a preconfigured loader. Used by tests to
    /// point at a mock endpoint.
    pub fn with_loader(loader: ObservationLoader) -> Self {
        Self { loader }
    }

    /// Downloads `[start, end]` observations for every station, writing
    /// `<station_id>.csv` files and [`STATIONS_META_FILE_NAME`] under
    /// `out_dir`.
    pub async fn run(
        &self,
        stations: &[Station],
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
        out_dir: &Path,
    ) -> Result<FetchReport, FetchError> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| FetchError::OutputDirCreation(out_dir.to_path_buf(), e))?;

        write_station_manifest(stations, out_dir.join(STATIONS_META_FILE_NAME)).await?;

        let mut results: Vec<(String, Result<DataFrame, FetchError>)> = stream::iter(stations)
            .map(|station| async move {
                let result = self
                    .fetch_station_with_retry(&station.id, interval, start, end)
                    .await;
                (station.id.clone(), result)
            })
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;
        // buffer_unordered yields in completion order; normalize.
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = FetchReport {
            requested: stations.len(),
            ..Default::default()
        };

        for (station_id, result) in results {
            match result {
                Ok(frame) if frame.height() == 0 => {
                    info!(
                        "Station {}: no observations between {} and {}",
                        station_id, start, end
                    );
                    report.empty.push(station_id);
                }
                Ok(frame) => {
                    let rows = frame.height();
                    let path = out_dir.join(format!("{station_id}.csv"));
                    write_station_csv(frame, path.clone()).await?;
                    info!("Station {}: {} rows -> {}", station_id, rows, path.display());
                    report.fetched.push(StationFile {
                        station: station_id,
                        rows,
                        path,
                    });
                }
                Err(FetchError::NoData { .. }) => {
                    info!("Station {}: no {} data published", station_id, interval);
                    report.empty.push(station_id);
                }
                Err(error) => {
                    warn!("Station {}: giving up: {}", station_id, error);
                    report.failed.push(StationFailure {
                        station: station_id,
                        error,
                    });
                }
            }
        }

        info!(
            "Fetched {}/{} stations ({} empty, {} failed), {} rows",
            report.fetched.len(),
            report.requested,
            report.empty.len(),
            report.failed.len(),
            report.rows_total()
        );
        Ok(report)
    }

    /// One station download with bounded exponential backoff on transient
    /// failures.
    async fn fetch_station_with_retry(
        &self,
        station_id: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self
                .loader
                .station_frame(station_id, interval, start, end)
                .await
            {
                Ok(frame) => return Ok(frame),
                Err(e) if e.is_transient() && attempt + 1 < MAX_FETCH_ATTEMPTS => {
                    let delay = Duration::from_secs(1 << attempt);
                    warn!(
                        "Station {}: attempt {}/{} failed ({}), retrying in {:?}",
                        station_id,
                        attempt + 1,
                        MAX_FETCH_ATTEMPTS,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for WindDownloader {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_station_csv(mut frame: DataFrame, path: PathBuf) -> Result<(), FetchError> {
    task::spawn_blocking(move || {
        let file = std::fs::File::create(&path)
            .map_err(|e| FetchError::CsvWriteIo(path.clone(), e))?;
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut frame)
            .map_err(|e| FetchError::CsvWritePolars(path.clone(), e))?;
        Ok::<(), FetchError>(())
    })
    .await??;
    Ok(())
}

async fn write_station_manifest(stations: &[Station], path: PathBuf) -> Result<(), FetchError> {
    let frame = df!(
        "station" => stations.iter().map(|s| s.id.clone()).collect::<Vec<_>>(),
        "name" => stations.iter().map(|s| s.display_name().to_string()).collect::<Vec<_>>(),
        "country" => stations.iter().map(|s| s.country.clone()).collect::<Vec<_>>(),
        "latitude" => stations.iter().map(|s| s.location.latitude).collect::<Vec<_>>(),
        "longitude" => stations.iter().map(|s| s.location.longitude).collect::<Vec<_>>(),
        "elevation" => stations.iter().map(|s| s.location.elevation).collect::<Vec<_>>(),
    )
    .map_err(|e| FetchError::CsvWritePolars(path.clone(), e))?;
    write_station_csv(frame, path).await
}
