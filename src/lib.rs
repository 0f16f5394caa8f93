mod config;
mod error;
mod fetch;
mod merge;
mod rose;
mod stations;
mod types;
mod utils;
mod wind_atlas;

pub use error::WindAtlasError;
pub use wind_atlas::*;

pub use config::{ConfigError, DownloadSpec, RoseSpec, DEFAULT_AIR_DENSITY};

pub use fetch::downloader::{
    FetchReport, StationFailure, StationFile, WindDownloader, STATIONS_META_FILE_NAME,
};
pub use fetch::error::FetchError;
pub use fetch::observation_loader::{
    ObservationLoader, DATETIME_FORMAT, DEFAULT_BULK_URL, WIND_SCHEMA_COLUMNS,
};

pub use merge::{merge_station_files, MergeError, MergeSummary, MERGED_FILE_NAME};

pub use rose::aggregate::{build_atlas, RoseReport};
pub use rose::error::RoseError;
pub use rose::stats::{
    fit_weibull, mean_power_density, percentile, WeibullFit, MIN_WEIBULL_SAMPLES,
};

pub use stations::error::StationIndexError;
pub use stations::station_index::{Coverage, StationFilter, StationIndex};

pub use types::bounding_box::{BoundingBox, BoundingBoxError};
pub use types::cadence::{Cadence, InvalidFrequency, Period};
pub use types::interval::{Interval, InvalidInterval};
pub use types::sector::{Sector, SECTOR_WIDTH_DEG};
pub use types::speed_bins::{SpeedBins, SpeedBinsError, DEFAULT_SPEED_BIN_EDGES};
pub use types::station::{DateRange, Identifiers, Inventory, Location, Station, YearRange};
