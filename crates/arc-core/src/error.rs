use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ArcResult<T> = Result<T, ArcError>;

#[derive(Debug, Error)]
pub enum ArcError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("delivery error: {0}")]
    Delivery(String),
}

impl ArcError {
    /// Attach the offending path to an I/O error.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ArcError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn is_crypto(&self) -> bool {
        matches!(self, ArcError::Crypto(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ArcError::Validation(_))
    }
}
