//! Builds per-period directional-frequency tables and per-station wind
//! climate summaries from a merged wind dataset.

use crate::config::RoseSpec;
use crate::fetch::observation_loader::{DATETIME_FORMAT, WIND_SCHEMA_COLUMNS};
use crate::rose::error::RoseError;
use crate::rose::stats;
use crate::types::cadence::Period;
use crate::types::sector::Sector;
use chrono::NaiveDateTime;
use log::{info, warn};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outcome of one aggregation run.
#[derive(Debug)]
pub struct RoseReport {
    /// Periods for which a frequency table was written.
    pub periods: Vec<Period>,
    /// Paths of the written frequency tables, one per period.
    pub table_paths: Vec<PathBuf>,
    /// Path of the per-station atlas summary.
    pub atlas_path: PathBuf,
    /// Observations that entered the frequency tables.
    pub rows_used: usize,
    /// Observations excluded for missing direction or speed.
    pub rows_missing: usize,
}

#[derive(Debug)]
struct PeriodAccum {
    /// counts[sector][speed_bin]
    counts: Vec<Vec<i64>>,
    valid: i64,
    missing: i64,
}

impl PeriodAccum {
    fn new(bin_count: usize) -> Self {
        Self {
            counts: vec![vec![0; bin_count]; Sector::COUNT],
            valid: 0,
            missing: 0,
        }
    }
}

#[derive(Debug, Default)]
struct StationAccum {
    n: i64,
    /// Rows excluded from the frequency denominator.
    missing: i64,
    /// Valid speeds, for the summary statistics.
    speeds: Vec<f64>,
}

/// Aggregates the merged dataset at `spec.input` into one frequency table
/// per period (`wind_rose_<period>.csv`) and a per-station summary
/// (`wind_atlas_<freq>.csv`) under `spec.out_dir`.
///
/// A period without a single valid observation produces no table. Rows
/// with missing direction or speed never enter a table's denominator; they
/// are counted per station in the summary's `n_missing` column.
pub fn build_atlas(spec: &RoseSpec) -> Result<RoseReport, RoseError> {
    if !spec.input.exists() {
        return Err(RoseError::InputNotFound(spec.input.clone()));
    }

    let merged = read_merged(&spec.input)?;

    let datetime_col = merged.column("datetime")?.str()?;
    let station_col = merged.column("station")?.str()?;
    let wdir_col = merged.column("wdir")?.f64()?;
    let wspd_col = merged.column("wspd")?.f64()?;

    let bin_count = spec.speed_bins.count();
    let mut periods: BTreeMap<Period, PeriodAccum> = BTreeMap::new();
    let mut stations: BTreeMap<(String, Period), StationAccum> = BTreeMap::new();

    for i in 0..merged.height() {
        let (Some(station), Some(datetime_str)) = (station_col.get(i), datetime_col.get(i)) else {
            warn!("Dropping merged row {} without station or timestamp", i);
            continue;
        };
        let datetime = NaiveDateTime::parse_from_str(datetime_str, DATETIME_FORMAT).map_err(
            |e| RoseError::TimestampParse {
                value: datetime_str.to_string(),
                source: e,
            },
        )?;
        let period = spec.cadence.period_of(datetime);

        let sector = wdir_col.get(i).and_then(Sector::from_degrees);
        let bin = wspd_col.get(i).and_then(|v| spec.speed_bins.index(v));

        let period_accum = periods
            .entry(period)
            .or_insert_with(|| PeriodAccum::new(bin_count));
        let station_accum = stations
            .entry((station.to_string(), period))
            .or_default();
        station_accum.n += 1;

        match (sector, bin) {
            (Some(sector), Some(bin)) => {
                period_accum.counts[sector.index()][bin] += 1;
                period_accum.valid += 1;
            }
            _ => {
                period_accum.missing += 1;
                station_accum.missing += 1;
            }
        }

        if let Some(speed) = wspd_col.get(i) {
            if speed.is_finite() {
                station_accum.speeds.push(speed);
            }
        }
    }

    std::fs::create_dir_all(&spec.out_dir)
        .map_err(|e| RoseError::OutputDirCreation(spec.out_dir.clone(), e))?;

    let mut report = RoseReport {
        periods: Vec::new(),
        table_paths: Vec::new(),
        atlas_path: spec
            .out_dir
            .join(format!("wind_atlas_{}.csv", spec.cadence.file_suffix())),
        rows_used: 0,
        rows_missing: 0,
    };

    for (period, accum) in &periods {
        report.rows_missing += accum.missing as usize;
        if accum.valid == 0 {
            info!("Period {}: no valid observations, skipping table", period);
            continue;
        }
        report.rows_used += accum.valid as usize;

        let path = spec.out_dir.join(format!("wind_rose_{period}.csv"));
        write_frequency_table(&path, *period, accum, spec)?;
        info!(
            "Period {}: {} observations ({} excluded) -> {}",
            period,
            accum.valid,
            accum.missing,
            path.display()
        );
        report.periods.push(*period);
        report.table_paths.push(path);
    }

    write_atlas_summary(&report.atlas_path, &stations, spec)?;
    info!(
        "Atlas summary for {} station-periods -> {}",
        stations.len(),
        report.atlas_path.display()
    );
    Ok(report)
}

fn read_merged(path: &Path) -> Result<DataFrame, RoseError> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| RoseError::CsvRead {
            path: path.to_path_buf(),
            source: e,
        })?
        .finish()
        .map_err(|e| RoseError::CsvRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    let expected: Vec<String> = WIND_SCHEMA_COLUMNS.iter().map(|c| c.to_string()).collect();
    let found: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();
    if found != expected {
        return Err(RoseError::SchemaMismatch {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }

    Ok(frame
        .lazy()
        .with_columns([
            col("station").cast(DataType::String),
            col("datetime").cast(DataType::String),
            col("wdir").cast(DataType::Float64),
            col("wspd").cast(DataType::Float64),
            col("wpgt").cast(DataType::Float64),
        ])
        .collect()?)
}

/// Writes the dense (sector x speed-bin) frequency table of one period.
fn write_frequency_table(
    path: &Path,
    period: Period,
    accum: &PeriodAccum,
    spec: &RoseSpec,
) -> Result<(), RoseError> {
    let bin_count = spec.speed_bins.count();
    let rows = Sector::COUNT * bin_count;
    let total = accum.valid as f64;

    let mut period_col: Vec<String> = Vec::with_capacity(rows);
    let mut sector_col: Vec<String> = Vec::with_capacity(rows);
    let mut bin_col: Vec<String> = Vec::with_capacity(rows);
    let mut count_col: Vec<i64> = Vec::with_capacity(rows);
    let mut freq_col: Vec<f64> = Vec::with_capacity(rows);

    for sector in Sector::ALL {
        for bin in 0..bin_count {
            let count = accum.counts[sector.index()][bin];
            period_col.push(period.to_string());
            sector_col.push(sector.label().to_string());
            bin_col.push(spec.speed_bins.label(bin).to_string());
            count_col.push(count);
            freq_col.push(count as f64 / total);
        }
    }

    let frame = df!(
        "period" => period_col,
        "sector" => sector_col,
        "speed_bin" => bin_col,
        "count" => count_col,
        "frequency" => freq_col,
    )?;
    write_csv(frame, path)
}

/// Writes the per-(station, period) summary statistics.
fn write_atlas_summary(
    path: &Path,
    stations: &BTreeMap<(String, Period), StationAccum>,
    spec: &RoseSpec,
) -> Result<(), RoseError> {
    let rows = stations.len();
    let mut station_col: Vec<String> = Vec::with_capacity(rows);
    let mut period_col: Vec<String> = Vec::with_capacity(rows);
    let mut n_col: Vec<i64> = Vec::with_capacity(rows);
    let mut missing_col: Vec<i64> = Vec::with_capacity(rows);
    let mut mean_col: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut p50_col: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut p90_col: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut shape_col: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut scale_col: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut power_col: Vec<Option<f64>> = Vec::with_capacity(rows);

    for ((station, period), accum) in stations {
        let mut speeds = accum.speeds.clone();
        speeds.sort_by(|a, b| a.total_cmp(b));
        let fit = stats::fit_weibull(&speeds);

        station_col.push(station.clone());
        period_col.push(period.to_string());
        n_col.push(accum.n);
        missing_col.push(accum.missing);
        mean_col.push(stats::mean(&speeds));
        p50_col.push(stats::percentile(&speeds, 50.0));
        p90_col.push(stats::percentile(&speeds, 90.0));
        shape_col.push(fit.map(|f| f.shape));
        scale_col.push(fit.map(|f| f.scale));
        power_col.push(stats::mean_power_density(&speeds, spec.rho));
    }

    let frame = df!(
        "station" => station_col,
        "period" => period_col,
        "n" => n_col,
        "n_missing" => missing_col,
        "mean" => mean_col,
        "p50" => p50_col,
        "p90" => p90_col,
        "weibull_k" => shape_col,
        "weibull_c" => scale_col,
        "power_density" => power_col,
    )?;
    write_csv(frame, path)
}

fn write_csv(mut frame: DataFrame, path: &Path) -> Result<(), RoseError> {
    let file = std::fs::File::create(path)
        .map_err(|e| RoseError::CsvWriteIo(path.to_path_buf(), e))?;
    CsvWriter::new(file)
        .include_header(true)
        .finish(&mut frame)
        .map_err(|e| RoseError::CsvWritePolars(path.to_path_buf(), e))?;
    Ok(())
}
