use std::path::PathBuf;

use crate::config::ConfigError;

pub type Result<T, E = HarvestError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("chunk size must be at least one year")]
    ZeroChunk,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid movie id {value:?} on line {line} of {path}")]
    InvalidMovieId {
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("failed to write csv: {0}")]
    Csv(#[from] csv::Error),
}

impl HarvestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarvestError::Io {
            path: path.into(),
            source,
        }
    }
}
