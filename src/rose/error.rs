use crate::types::cadence::InvalidFrequency;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoseError {
    #[error("Input dataset '{0}' does not exist")]
    InputNotFound(PathBuf),

    #[error(transparent)]
    InvalidFrequency(#[from] InvalidFrequency),

    #[error("Failed to read merged dataset '{path}'")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Merged dataset '{path}' columns {found:?} do not match the wind schema {expected:?}")]
    SchemaMismatch {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Malformed timestamp '{value}' in merged dataset")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed processing merged dataset")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("I/O error writing '{0}'")]
    CsvWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing '{0}'")]
    CsvWritePolars(PathBuf, #[source] PolarsError),
}
