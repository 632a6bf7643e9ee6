use thiserror::Error;

use crate::{cancel::Cancelled, domain::track::TrackId};

/// Failures of the track record store
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("track {0} not found")]
    TrackNotFound(TrackId),

    #[error("invalid track id")]
    InvalidTrackId,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failures of the content store
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content object '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("content object '{key}' truncated: expected {expected} bytes, wrote {written}")]
    Truncated {
        key: String,
        expected: u64,
        written: u64,
    },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl ContentError {
    pub fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
