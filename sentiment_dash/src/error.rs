use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = DashError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("{path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("unparseable date {0:?}")]
    BadDate(String),

    #[error("loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DashError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
