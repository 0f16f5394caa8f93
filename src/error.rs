use crate::config::ConfigError;
use crate::fetch::error::FetchError;
use crate::merge::MergeError;
use crate::rose::error::RoseError;
use crate::stations::error::StationIndexError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindAtlasError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    StationIndex(#[from] StationIndexError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Rose(#[from] RoseError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("No station matches the requested region/bounding-box filters")]
    NoStationsMatched,

    #[error("None of the {requested} selected stations produced observations")]
    NoStationData { requested: usize },

    #[error("Run deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
