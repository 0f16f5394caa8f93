use crate::fetch::error::FetchError;
use crate::types::interval::Interval;
use async_compression::tokio::bufread::GzipDecoder;
use chrono::{NaiveDate, NaiveDateTime};
use futures_util::TryStreamExt;
use log::{info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::task;
use tokio_util::io::StreamReader;

/// Base URL of the bulk observation endpoint.
pub const DEFAULT_BULK_URL: &str = "https://bulk.meteostat.net/v2";

/// Column layout of the per-station and merged wind datasets.
pub const WIND_SCHEMA_COLUMNS: [&str; 5] = ["station", "datetime", "wdir", "wspd", "wpgt"];

/// Timestamp format used in the wind datasets (hour resolution).
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) const COL_STATION: &str = "station";
pub(crate) const COL_DATETIME: &str = "datetime";
pub(crate) const COL_DATE: &str = "date";
pub(crate) const COL_HOUR: &str = "hour";
pub(crate) const COL_WDIR: &str = "wdir";
pub(crate) const COL_WSPD: &str = "wspd";
pub(crate) const COL_WPGT: &str = "wpgt";

/// Downloads raw per-station observation files and reduces them to the
/// wind dataset schema.
pub struct ObservationLoader {
    download_client: Client,
    base_url: String,
}

impl ObservationLoader {
    pub fn new(download_client: Client) -> Self {
        Self::with_base_url(download_client, DEFAULT_BULK_URL.to_string())
    }

    /// Overrides the bulk endpoint, used to point at a local server in
    /// tests.
    pub fn with_base_url(download_client: Client, base_url: String) -> Self {
        Self {
            download_client,
            base_url,
        }
    }

    /// Fetches one station's observations and returns a wind DataFrame
    /// with the [`WIND_SCHEMA_COLUMNS`] layout, restricted to the
    /// inclusive `[start, end]` date range.
    pub async fn station_frame(
        &self,
        station_id: &str,
        interval: Interval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, FetchError> {
        let raw_bytes = self.download(interval, station_id).await?;
        let station_owned = station_id.to_string();

        task::spawn_blocking(move || {
            let raw = csv_to_dataframe(raw_bytes, &station_owned, interval)?;
            wind_observations(raw, &station_owned, interval, start, end)
        })
        .await?
    }

    /// Downloads and decompresses the raw CSV for one station.
    async fn download(&self, interval: Interval, station: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!(
            "{}/{}/{}.csv.gz",
            self.base_url,
            interval.path_segment(),
            station
        );
        info!("Downloading observations from {}", url);

        let response = self
            .download_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    // A missing file means the station publishes no data
                    // at this granularity.
                    Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                        FetchError::NoData {
                            station: station.to_string(),
                            interval,
                        }
                    }
                    Some(status) => {
                        warn!("HTTP {} for {}", status, url);
                        FetchError::HttpStatus {
                            url,
                            status,
                            source: e,
                        }
                    }
                    None => FetchError::NetworkRequest(url, e),
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(stream_reader);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed).await?;
        info!(
            "Downloaded and decompressed {} bytes for station {}",
            decompressed.len(),
            station
        );
        Ok(decompressed)
    }
}

/// Parses raw headerless CSV bytes into a DataFrame with the fixed column
/// names of the granularity's schema.
fn csv_to_dataframe(
    bytes: Vec<u8>,
    station: &str,
    interval: Interval,
) -> Result<DataFrame, FetchError> {
    let schema_names = interval.schema_column_names();

    let mut temp_file = NamedTempFile::new().map_err(|e| FetchError::CsvReadIo {
        station: station.to_string(),
        source: e,
    })?;
    temp_file
        .write_all(&bytes)
        .and_then(|_| temp_file.flush())
        .map_err(|e| FetchError::CsvReadIo {
            station: station.to_string(),
            source: e,
        })?;

    let mut df = CsvReadOptions::default()
        .with_has_header(false)
        .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
        .map_err(|e| FetchError::CsvReadPolars {
            station: station.to_string(),
            source: e,
        })?
        .finish()
        .map_err(|e| FetchError::CsvReadPolars {
            station: station.to_string(),
            source: e,
        })?;

    // An empty body parses to a zero-width frame; treat it as no rows.
    if df.width() == 0 {
        return Ok(DataFrame::empty());
    }

    if df.width() != schema_names.len() {
        warn!(
            "CSV column count ({}) does not match the {} schema ({}) for station {}",
            df.width(),
            interval,
            schema_names.len(),
            station
        );
        return Err(FetchError::SchemaMismatch {
            station: station.to_string(),
            interval,
            expected: schema_names.len(),
            found: df.width(),
        });
    }

    df.set_column_names(schema_names.iter().copied())
        .map_err(|e| FetchError::DataFrameProcessing {
            station: station.to_string(),
            source: e,
        })?;

    Ok(df)
}

/// Reduces a raw observation frame to the wind dataset schema.
///
/// Rows outside `[start, end]`, rows without a usable timestamp and rows
/// where every wind column is null are dropped.
pub(crate) fn wind_observations(
    raw: DataFrame,
    station_id: &str,
    interval: Interval,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<DataFrame, FetchError> {
    let processing_err = |source: PolarsError| FetchError::DataFrameProcessing {
        station: station_id.to_string(),
        source,
    };

    if raw.height() == 0 || raw.width() == 0 {
        return empty_wind_frame().map_err(processing_err);
    }

    let mut casts = vec![
        col(COL_WDIR).cast(DataType::Float64),
        col(COL_WSPD).cast(DataType::Float64),
        col(COL_WPGT).cast(DataType::Float64),
    ];
    if interval == Interval::Hourly {
        casts.push(col(COL_HOUR).cast(DataType::Int64));
    }
    let raw = raw.lazy().with_columns(casts).collect().map_err(processing_err)?;

    let date_col = raw.column(COL_DATE).map_err(processing_err)?.str().map_err(processing_err)?;
    let hour_col = match interval {
        Interval::Hourly => Some(
            raw.column(COL_HOUR)
                .map_err(processing_err)?
                .i64()
                .map_err(processing_err)?,
        ),
        Interval::Daily => None,
    };
    let wdir_col = raw.column(COL_WDIR).map_err(processing_err)?.f64().map_err(processing_err)?;
    let wspd_col = raw.column(COL_WSPD).map_err(processing_err)?.f64().map_err(processing_err)?;
    let wpgt_col = raw.column(COL_WPGT).map_err(processing_err)?.f64().map_err(processing_err)?;

    let mut stations: Vec<String> = Vec::new();
    let mut datetimes: Vec<String> = Vec::new();
    let mut wdirs: Vec<Option<f64>> = Vec::new();
    let mut wspds: Vec<Option<f64>> = Vec::new();
    let mut wpgts: Vec<Option<f64>> = Vec::new();

    for i in 0..raw.height() {
        let Some(date_str) = date_col.get(i) else {
            continue;
        };
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
            FetchError::TimestampParse {
                station: station_id.to_string(),
                value: date_str.to_string(),
                source: e,
            }
        })?;
        if date < start || date > end {
            continue;
        }

        let datetime: NaiveDateTime = match &hour_col {
            Some(hours) => {
                let Some(hour) = hours.get(i) else {
                    continue;
                };
                let Some(dt) = u32::try_from(hour)
                    .ok()
                    .and_then(|h| date.and_hms_opt(h, 0, 0))
                else {
                    continue;
                };
                dt
            }
            None => match date.and_hms_opt(0, 0, 0) {
                Some(dt) => dt,
                None => continue,
            },
        };

        let wdir = wdir_col.get(i);
        let wspd = wspd_col.get(i);
        let wpgt = wpgt_col.get(i);
        if wdir.is_none() && wspd.is_none() && wpgt.is_none() {
            continue;
        }

        stations.push(station_id.to_string());
        datetimes.push(datetime.format(DATETIME_FORMAT).to_string());
        wdirs.push(wdir);
        wspds.push(wspd);
        wpgts.push(wpgt);
    }

    df!(
        COL_STATION => stations,
        COL_DATETIME => datetimes,
        COL_WDIR => wdirs,
        COL_WSPD => wspds,
        COL_WPGT => wpgts,
    )
    .map_err(processing_err)
}

fn empty_wind_frame() -> PolarsResult<DataFrame> {
    df!(
        COL_STATION => Vec::<String>::new(),
        COL_DATETIME => Vec::<String>::new(),
        COL_WDIR => Vec::<Option<f64>>::new(),
        COL_WSPD => Vec::<Option<f64>>::new(),
        COL_WPGT => Vec::<Option<f64>>::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw_hourly_frame(rows: Vec<(&str, i64, Option<f64>, Option<f64>, Option<f64>)>) -> DataFrame {
        let n = rows.len();
        let none_f64 = vec![None::<f64>; n];
        df!(
            "date" => rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
            "hour" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "temp" => none_f64.clone(),
            "dwpt" => none_f64.clone(),
            "rhum" => none_f64.clone(),
            "prcp" => none_f64.clone(),
            "snow" => none_f64.clone(),
            "wdir" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            "wspd" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            "wpgt" => rows.iter().map(|r| r.4).collect::<Vec<_>>(),
            "pres" => none_f64.clone(),
            "tsun" => none_f64.clone(),
            "coco" => none_f64,
        )
        .unwrap()
    }

    #[test]
    fn keeps_rows_inside_range_only() {
        let raw = raw_hourly_frame(vec![
            ("2012-12-31", 23, Some(90.0), Some(3.0), None),
            ("2013-01-01", 0, Some(180.0), Some(4.0), None),
            ("2013-01-02", 12, Some(270.0), Some(5.0), None),
            ("2013-01-03", 0, Some(0.0), Some(6.0), None),
        ]);
        let out = wind_observations(
            raw,
            "TEST",
            Interval::Hourly,
            date(2013, 1, 1),
            date(2013, 1, 2),
        )
        .unwrap();
        assert_eq!(out.height(), 2);
        let datetimes = out.column("datetime").unwrap().str().unwrap();
        assert_eq!(datetimes.get(0), Some("2013-01-01 00:00:00"));
        assert_eq!(datetimes.get(1), Some("2013-01-02 12:00:00"));
    }

    #[test]
    fn drops_rows_with_all_wind_columns_null() {
        let raw = raw_hourly_frame(vec![
            ("2013-01-01", 0, None, None, None),
            ("2013-01-01", 1, Some(45.0), None, None),
        ]);
        let out = wind_observations(
            raw,
            "TEST",
            Interval::Hourly,
            date(2013, 1, 1),
            date(2013, 1, 1),
        )
        .unwrap();
        // Partially-null rows survive, fully-null rows do not.
        assert_eq!(out.height(), 1);
        assert_eq!(out.column("wspd").unwrap().f64().unwrap().get(0), None);
    }

    #[test]
    fn daily_rows_land_on_midnight() {
        let raw = df!(
            "date" => ["2013-06-01"],
            "tavg" => [Some(20.0)],
            "tmin" => [Some(15.0)],
            "tmax" => [Some(25.0)],
            "prcp" => [None::<f64>],
            "snow" => [None::<f64>],
            "wdir" => [Some(200.0)],
            "wspd" => [Some(7.5)],
            "wpgt" => [Some(12.0)],
            "pres" => [None::<f64>],
            "tsun" => [None::<f64>],
        )
        .unwrap();
        let out = wind_observations(
            raw,
            "TEST",
            Interval::Daily,
            date(2013, 1, 1),
            date(2013, 12, 31),
        )
        .unwrap();
        assert_eq!(out.height(), 1);
        let datetimes = out.column("datetime").unwrap().str().unwrap();
        assert_eq!(datetimes.get(0), Some("2013-06-01 00:00:00"));
    }

    #[test]
    fn empty_input_produces_empty_schema_frame() {
        let out = wind_observations(
            DataFrame::empty(),
            "TEST",
            Interval::Hourly,
            date(2013, 1, 1),
            date(2013, 1, 2),
        )
        .unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.get_column_names(), WIND_SCHEMA_COLUMNS);
    }

    async fn gzip(bytes: &[u8]) -> Vec<u8> {
        use async_compression::tokio::bufread::GzipEncoder;
        let mut encoder = GzipEncoder::new(bytes);
        let mut out = Vec::new();
        encoder.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn downloads_and_reduces_station_csv() {
        let server = MockServer::start().await;
        let csv = "2013-01-01,0,,,,,,90,3.1,5.0,,,\n2013-01-01,1,,,,,,100,3.4,,,\n";
        let body = gzip(csv.as_bytes()).await;
        Mock::given(method("GET"))
            .and(path("/hourly/TEST.csv.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        let loader = ObservationLoader::with_base_url(Client::new(), server.uri());
        let frame = loader
            .station_frame("TEST", Interval::Hourly, date(2013, 1, 1), date(2013, 1, 2))
            .await
            .unwrap();

        assert_eq!(frame.height(), 2);
        assert_eq!(frame.get_column_names(), WIND_SCHEMA_COLUMNS);
        let wdir = frame.column("wdir").unwrap().f64().unwrap();
        assert_eq!(wdir.get(0), Some(90.0));
        assert_eq!(wdir.get(1), Some(100.0));
    }

    #[tokio::test]
    async fn missing_station_file_maps_to_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hourly/NOPE.csv.gz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = ObservationLoader::with_base_url(Client::new(), server.uri());
        let err = loader
            .station_frame("NOPE", Interval::Hourly, date(2013, 1, 1), date(2013, 1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoData { .. }));
    }
}
