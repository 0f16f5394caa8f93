//! Aggregates a merged wind dataset into per-period wind-rose frequency
//! tables and a per-station wind-atlas summary.
//!
//! Usage: wind_rose --input output/wind_all_stations.csv --out atlas --freq annual

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use wind_atlas::{build_atlas, Cadence, RoseSpec, WindAtlasError, DEFAULT_AIR_DENSITY};

#[derive(Parser, Debug)]
#[command(
    name = "wind_rose",
    about = "Build wind-rose frequency tables and atlas statistics from a merged wind dataset"
)]
struct Args {
    /// Path of the merged dataset CSV
    #[arg(long)]
    input: PathBuf,

    /// Output directory for the frequency tables and the atlas summary
    #[arg(long, default_value = "atlas")]
    out: PathBuf,

    /// Aggregation cadence (annual | monthly)
    #[arg(long, default_value = "annual")]
    freq: Cadence,

    /// Air density in kg/m³ for power-density statistics
    #[arg(long, default_value_t = DEFAULT_AIR_DENSITY)]
    rho: f64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("wind_rose: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), WindAtlasError> {
    let mut spec = RoseSpec::new(args.input, args.out, args.freq);
    spec.rho = args.rho;
    spec.validate()?;

    let report = build_atlas(&spec)?;

    for (period, path) in report.periods.iter().zip(&report.table_paths) {
        println!("{period}: wind rose -> {}", path.display());
    }
    println!(
        "{} observations aggregated, {} excluded for missing direction or speed",
        report.rows_used, report.rows_missing
    );
    println!("Atlas summary -> {}", report.atlas_path.display());
    Ok(())
}
