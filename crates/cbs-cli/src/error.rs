use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("unknown codec {0:?}; expected one of av1, mpeg2, vp8, vp9")]
    UnknownCodec(String),

    #[error("unknown output format {0:?}; expected text or json")]
    UnknownFormat(String),

    #[error(transparent)]
    Bitstream(#[from] cbs_core::CbsError),

    #[error("failed to render fragment as json: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;
