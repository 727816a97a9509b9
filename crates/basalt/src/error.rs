//! Fatal-startup errors for node bootstrap (§7 "Fatal startup: process
//! exits non-zero with a descriptive message").

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BasaltError {
    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("consensus log rejected bootstrap: {0}")]
    Bootstrap(#[from] basalt_consensus::Error),
}

pub type Result<T> = std::result::Result<T, BasaltError>;
