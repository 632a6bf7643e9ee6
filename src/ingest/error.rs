use thiserror::Error;

use crate::{
    audio::duration::ExtractionError,
    cancel::Cancelled,
    domain::{format::ClassificationError, track::TrackId},
    storage::error::{ContentError, StorageError},
};

/// Everything an ingestion call can fail with.
///
/// Cancellation is folded out of the wrapped errors so callers see it as one kind.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid upload: {0}")]
    Validation(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(#[from] ClassificationError),

    #[error("duration extraction failed: {0}")]
    Extraction(#[source] ExtractionError),

    #[error("content store failure: {0}")]
    Io(#[source] ContentError),

    #[error("record store failure: {0}")]
    Store(#[source] StorageError),

    #[error("track {0} not found")]
    NotFound(TrackId),

    #[error("operation cancelled")]
    Cancelled,
}

impl IngestError {
    /// HTTP style status an outer layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::Validation(_) | IngestError::UnsupportedFormat(_) => 400,
            IngestError::NotFound(_) => 404,
            IngestError::Cancelled => 499,
            IngestError::Extraction(_) | IngestError::Io(_) | IngestError::Store(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<Cancelled> for IngestError {
    fn from(_: Cancelled) -> Self {
        IngestError::Cancelled
    }
}

impl From<ExtractionError> for IngestError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Cancelled(_) => IngestError::Cancelled,
            err => IngestError::Extraction(err),
        }
    }
}

impl From<ContentError> for IngestError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Cancelled(_) => IngestError::Cancelled,
            err => IngestError::Io(err),
        }
    }
}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TrackNotFound(id) => IngestError::NotFound(id),
            err => IngestError::Store(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = TrackId::generate();
        assert_eq!(IngestError::Validation("x".into()).status_code(), 400);
        assert_eq!(
            IngestError::from(ClassificationError::UnsupportedExtension("ogg".into())).status_code(),
            400
        );
        assert_eq!(IngestError::NotFound(id).status_code(), 404);
        assert_eq!(
            IngestError::from(ExtractionError::NoAudioTrack).status_code(),
            500
        );
        assert_eq!(
            IngestError::from(StorageError::InvalidTrackId).status_code(),
            500
        );
    }

    #[test]
    fn test_wrapped_errors_are_unfolded() {
        let id = TrackId::generate();
        assert!(matches!(
            IngestError::from(StorageError::TrackNotFound(id)),
            IngestError::NotFound(found) if found == id
        ));
        assert!(matches!(
            IngestError::from(ContentError::Cancelled(Cancelled)),
            IngestError::Cancelled
        ));
        assert!(matches!(
            IngestError::from(ExtractionError::Cancelled(Cancelled)),
            IngestError::Cancelled
        ));
        assert!(IngestError::Cancelled.is_client_error());
        assert!(!IngestError::from(StorageError::InvalidTrackId).is_client_error());
    }
}
