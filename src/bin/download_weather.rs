//! Downloads per-station wind observations for a date range, writing one
//! CSV per station and optionally a merged dataset.
//!
//! Usage: download_weather --start 2024-01-01 --end 2024-12-31 \
//!     --interval hourly --region KR --limit 25 --out-dir output --merge

use chrono::NaiveDate;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use wind_atlas::{BoundingBox, ConfigError, Interval, WindAtlas, WindAtlasError};

#[derive(Parser, Debug)]
#[command(
    name = "download_weather",
    about = "Download wind observations per weather station, optionally merging them into one dataset"
)]
struct Args {
    /// First day of the range (YYYY-MM-DD, UTC)
    #[arg(long)]
    start: NaiveDate,

    /// Last day of the range (YYYY-MM-DD, UTC)
    #[arg(long)]
    end: NaiveDate,

    /// Observation granularity (hourly | daily)
    #[arg(long, default_value = "hourly")]
    interval: Interval,

    /// ISO country code filter (e.g. KR); all countries when omitted
    #[arg(long)]
    region: Option<String>,

    /// Bounding box filter
    #[arg(long, num_args = 4, value_names = ["MIN_LAT", "MAX_LAT", "MIN_LON", "MAX_LON"])]
    bbox: Option<Vec<f64>>,

    /// Maximum number of stations; all matching stations when omitted
    #[arg(long)]
    limit: Option<usize>,

    /// Directory for the per-station CSVs and the station manifest
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Station-dump cache directory (defaults to the platform cache dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Merge all station files into one dataset after fetching
    #[arg(long)]
    merge: bool,

    /// Overall wall-clock limit for the fetch stage, in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("download_weather: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), WindAtlasError> {
    let bbox = match args.bbox.as_deref() {
        Some(&[min_lat, max_lat, min_lon, max_lon]) => Some(
            BoundingBox::new(min_lat, max_lat, min_lon, max_lon).map_err(ConfigError::from)?,
        ),
        // clap enforces exactly four values.
        _ => None,
    };

    let atlas = match args.cache_dir {
        Some(dir) => WindAtlas::with_cache_folder(dir).await?,
        None => WindAtlas::new().await?,
    };

    let report = atlas
        .download()
        .start(args.start)
        .end(args.end)
        .interval(args.interval)
        .maybe_region(args.region)
        .maybe_bbox(bbox)
        .maybe_limit(args.limit)
        .out_dir(args.out_dir)
        .merge(args.merge)
        .maybe_deadline(args.deadline_secs.map(std::time::Duration::from_secs))
        .call()
        .await?;

    for file in &report.fetch.fetched {
        println!(
            "{}: {} rows -> {}",
            file.station,
            file.rows,
            file.path.display()
        );
    }
    for station in &report.fetch.empty {
        println!("{station}: no observations in range");
    }
    for failure in &report.fetch.failed {
        eprintln!("{}: failed: {}", failure.station, failure.error);
    }
    println!(
        "Fetched {}/{} stations, {} rows total ({} empty, {} failed)",
        report.fetch.fetched.len(),
        report.fetch.requested,
        report.fetch.rows_total(),
        report.fetch.empty.len(),
        report.fetch.failed.len()
    );
    if let Some(merged) = &report.merged {
        println!(
            "Merged dataset -> {} ({} rows from {} files)",
            merged.path.display(),
            merged.rows_out,
            merged.files
        );
    }
    Ok(())
}
