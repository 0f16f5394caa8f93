//! Combines the per-station CSVs of a fetch run into one unified dataset.

use crate::fetch::downloader::STATIONS_META_FILE_NAME;
use crate::fetch::observation_loader::WIND_SCHEMA_COLUMNS;
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the unified dataset written into the input directory.
pub const MERGED_FILE_NAME: &str = "wind_all_stations.csv";

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Failed to read input directory '{0}'")]
    InputDirRead(PathBuf, #[source] std::io::Error),

    #[error("No station files found under '{0}'")]
    NoInputFiles(PathBuf),

    #[error("Failed to read station file '{path}'")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Station file '{path}' columns {found:?} do not match the wind schema {expected:?}")]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Failed to combine station files")]
    Combine(#[source] PolarsError),

    #[error("I/O error writing merged file '{0}'")]
    CsvWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing merged file '{0}'")]
    CsvWritePolars(PathBuf, #[source] PolarsError),
}

/// Outcome of one merge.
#[derive(Debug)]
pub struct MergeSummary {
    /// Path of the unified dataset.
    pub path: PathBuf,
    /// Number of station files merged.
    pub files: usize,
    /// Sum of input rows.
    pub rows_in: usize,
    /// Rows in the unified dataset after exact-duplicate removal.
    pub rows_out: usize,
}

/// Merges all per-station CSVs under `input_dir` into
/// [`MERGED_FILE_NAME`] in the same directory.
///
/// Rows are kept verbatim apart from exact-duplicate removal, sorted by
/// `(datetime, station)`. Input files are not mutated; an earlier merged
/// file and the station manifest are ignored.
pub fn merge_station_files(input_dir: &Path) -> Result<MergeSummary, MergeError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .map_err(|e| MergeError::InputDirRead(input_dir.to_path_buf(), e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "csv")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name != MERGED_FILE_NAME && name != STATIONS_META_FILE_NAME)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(MergeError::NoInputFiles(input_dir.to_path_buf()));
    }

    let expected: Vec<String> = WIND_SCHEMA_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut frames: Vec<LazyFrame> = Vec::with_capacity(paths.len());
    let mut rows_in = 0usize;

    for path in &paths {
        let frame = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))
            .map_err(|e| MergeError::CsvRead {
                path: path.clone(),
                source: e,
            })?
            .finish()
            .map_err(|e| MergeError::CsvRead {
                path: path.clone(),
                source: e,
            })?;

        let found: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        if found != expected {
            return Err(MergeError::SchemaMismatch {
                path: path.clone(),
                expected,
                found,
            });
        }

        rows_in += frame.height();
        // Normalize dtypes so an all-null column in one file cannot make
        // the union fail.
        frames.push(frame.lazy().with_columns([
            col("station").cast(DataType::String),
            col("datetime").cast(DataType::String),
            col("wdir").cast(DataType::Float64),
            col("wspd").cast(DataType::Float64),
            col("wpgt").cast(DataType::Float64),
        ]));
    }

    let mut merged = concat(frames, UnionArgs::default())
        .map_err(MergeError::Combine)?
        .unique(None, UniqueKeepStrategy::First)
        .sort(["datetime", "station"], SortMultipleOptions::default())
        .collect()
        .map_err(MergeError::Combine)?;

    let out_path = input_dir.join(MERGED_FILE_NAME);
    let file = std::fs::File::create(&out_path)
        .map_err(|e| MergeError::CsvWriteIo(out_path.clone(), e))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(&mut merged)
        .map_err(|e| MergeError::CsvWritePolars(out_path.clone(), e))?;

    let summary = MergeSummary {
        path: out_path,
        files: paths.len(),
        rows_in,
        rows_out: merged.height(),
    };
    info!(
        "Merged {} files ({} rows in, {} rows out) -> {}",
        summary.files,
        summary.rows_in,
        summary.rows_out,
        summary.path.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wind_csv(path: &Path, rows: &[(&str, &str, Option<f64>, Option<f64>)]) {
        let mut frame = df!(
            "station" => rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
            "datetime" => rows.iter().map(|r| r.1.to_string()).collect::<Vec<_>>(),
            "wdir" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            "wspd" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
            "wpgt" => rows.iter().map(|_| None::<f64>).collect::<Vec<_>>(),
        )
        .unwrap();
        let file = std::fs::File::create(path).unwrap();
        CsvWriter::new(file)
            .include_header(true)
            .finish(&mut frame)
            .unwrap();
    }

    fn read_csv(path: &Path) -> DataFrame {
        CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .unwrap()
            .finish()
            .unwrap()
    }

    #[test]
    fn merges_all_rows_sorted_by_datetime_then_station() {
        let dir = tempfile::tempdir().unwrap();
        write_wind_csv(
            &dir.path().join("B.csv"),
            &[
                ("B", "2013-01-01 01:00:00", Some(10.0), Some(2.0)),
                ("B", "2013-01-01 00:00:00", Some(20.0), Some(3.0)),
            ],
        );
        write_wind_csv(
            &dir.path().join("A.csv"),
            &[("A", "2013-01-01 01:00:00", Some(30.0), Some(4.0))],
        );

        let summary = merge_station_files(dir.path()).unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.rows_in, 3);
        assert_eq!(summary.rows_out, 3);

        let merged = read_csv(&summary.path);
        let stations = merged.column("station").unwrap().str().unwrap();
        let datetimes = merged.column("datetime").unwrap().str().unwrap();
        assert_eq!(datetimes.get(0), Some("2013-01-01 00:00:00"));
        assert_eq!(stations.get(0), Some("B"));
        assert_eq!(datetimes.get(1), Some("2013-01-01 01:00:00"));
        assert_eq!(stations.get(1), Some("A"));
        assert_eq!(stations.get(2), Some("B"));
    }

    #[test]
    fn removes_exact_duplicate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let rows = [("A", "2013-01-01 00:00:00", Some(10.0), Some(2.0))];
        write_wind_csv(&dir.path().join("A.csv"), &rows);
        write_wind_csv(&dir.path().join("A_refetch.csv"), &rows);

        let summary = merge_station_files(dir.path()).unwrap();
        assert_eq!(summary.rows_in, 2);
        assert_eq!(summary.rows_out, 1);
    }

    #[test]
    fn schema_mismatch_names_the_offending_file() {
        let dir = tempfile::tempdir().unwrap();
        write_wind_csv(
            &dir.path().join("A.csv"),
            &[("A", "2013-01-01 00:00:00", Some(10.0), Some(2.0))],
        );
        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "station,datetime,speed\nA,2013-01-01 00:00:00,2.0\n").unwrap();

        let err = merge_station_files(dir.path()).unwrap_err();
        match err {
            MergeError::SchemaMismatch { path, .. } => assert_eq!(path, bad),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            merge_station_files(dir.path()),
            Err(MergeError::NoInputFiles(_))
        ));
    }

    #[test]
    fn remerge_ignores_previous_output_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_wind_csv(
            &dir.path().join("A.csv"),
            &[("A", "2013-01-01 00:00:00", Some(10.0), Some(2.0))],
        );
        std::fs::write(
            dir.path().join(STATIONS_META_FILE_NAME),
            "station,name,country,latitude,longitude,elevation\nA,Station A,KR,37.0,127.0,30\n",
        )
        .unwrap();

        let first = merge_station_files(dir.path()).unwrap();
        let first_bytes = std::fs::read(&first.path).unwrap();
        let second = merge_station_files(dir.path()).unwrap();
        let second_bytes = std::fs::read(&second.path).unwrap();

        assert_eq!(second.files, 1);
        assert_eq!(second.rows_out, 1);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("A.csv");
        write_wind_csv(
            &input,
            &[("A", "2013-01-01 00:00:00", Some(10.0), Some(2.0))],
        );
        let before = std::fs::read(&input).unwrap();
        merge_station_files(dir.path()).unwrap();
        assert_eq!(std::fs::read(&input).unwrap(), before);
    }
}
