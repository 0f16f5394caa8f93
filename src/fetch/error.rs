use crate::types::interval::Interval;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("No {interval} data published for station '{station}'")]
    NoData { station: String, interval: Interval },

    #[error("Data download or decompression failed")]
    DownloadIo(#[from] std::io::Error),

    // Errors during CSV reading (inside blocking task)
    #[error("I/O error processing CSV data for station '{station}'")]
    CsvReadIo {
        station: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Parsing error processing CSV data for station '{station}'")]
    CsvReadPolars {
        station: String,
        #[source]
        source: PolarsError,
    },

    #[error("CSV column count ({found}) does not match the {interval} schema ({expected}) for station {station}")]
    SchemaMismatch {
        station: String,
        interval: Interval,
        expected: usize,
        found: usize,
    },

    #[error("Malformed timestamp '{value}' in data for station {station}")]
    TimestampParse {
        station: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Failed processing DataFrame for station {station}: {source}")]
    DataFrameProcessing {
        station: String,
        #[source]
        source: PolarsError,
    },

    #[error("I/O error writing station file '{0}'")]
    CsvWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing station file '{0}'")]
    CsvWritePolars(PathBuf, #[source] PolarsError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl FetchError {
    /// Whether retrying the request may help: transport failures and
    /// rate-limit or server-side HTTP statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkRequest(..) | FetchError::DownloadIo(..) => true,
            FetchError::HttpStatus { status, .. } => {
                status.as_u16() == 429 || status.is_server_error()
            }
            _ => false,
        }
    }
}
