//! demos/plot_rose.rs
//!
//! Renders a wind-rose bar chart from a frequency table produced by the
//! `wind_rose` binary, using the `plotlars` crate.
//!
//! To run this demo:
//! cargo run --example plot_rose --features demos -- atlas/wind_rose_2024.csv

use std::error::Error;

use plotlars::{BarPlot, Legend, Plot, Text};
use polars::prelude::*;

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "atlas/wind_rose_2024.csv".to_string());

    println!("Reading frequency table from {path}...");
    let table = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.clone().into()))?
        .finish()?;

    // Sum speed bins per sector so the bars show total directional share.
    let per_sector = table
        .lazy()
        .group_by_stable([col("sector")])
        .agg([col("frequency").sum()])
        .collect()?;

    println!("Rendering wind rose for {path}...");
    plot_rose(&per_sector);
    println!("Plot shown in browser.");

    Ok(())
}

/// Plots directional frequency shares as a bar chart over the 16 sectors.
fn plot_rose(data: &DataFrame) {
    BarPlot::builder()
        .data(data)
        .labels("sector")
        .values("frequency")
        .plot_title(Text::from("Wind Rose").font("Arial").size(18))
        .legend(&Legend::new().x(0.05).y(0.9))
        .build()
        .plot();
}
