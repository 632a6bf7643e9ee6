//! Track ingestion: keeps the content store and the record store consistent
//!
//! Bytes are always written before the record that references them, and an object
//! a record still references is only removed after the record stops pointing at it.
//! When a later step fails the side effects of earlier steps are compensated on a
//! best effort basis.

use std::{fmt::Display, io::Read};

use log::{debug, error, info, warn};

use crate::{
    audio::duration::{DurationProbe, FrameDurationProbe},
    cancel::Cancellation,
    domain::{
        format::{SupportedFormat, classify},
        track::{NewTrackRecord, PlaybackDuration, TrackId, TrackRecord},
    },
    ingest::{error::IngestError, locks::TrackLocks, upload::content_key},
    storage::{
        content::ContentStore,
        error::ContentError,
        records::{TrackOrder, TrackRecordStore},
    },
};

pub mod error;
pub mod locks;
pub mod upload;

pub use upload::{FileUpload, TrackUpload};

/// Steps of an ingestion call, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Classifying,
    WritingBytes,
    ExtractingDuration,
    PersistingRecord,
    RemovingPrevious,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Classifying => "classifying",
            Stage::WritingBytes => "writing bytes",
            Stage::ExtractingDuration => "extracting duration",
            Stage::PersistingRecord => "persisting record",
            Stage::RemovingPrevious => "removing previous file",
        };
        f.write_str(name)
    }
}

/// A file that made it into the content store and decoded fine
#[derive(Debug)]
struct StoredFile {
    key: String,
    size_bytes: u64,
    duration: PlaybackDuration,
}

/// Main structure that sequences every write across the two stores
pub struct TrackIngestor<S, C, P = FrameDurationProbe> {
    records: S,
    content: C,
    probe: P,
    locks: TrackLocks,
}

impl<S, C> TrackIngestor<S, C>
where
    S: TrackRecordStore,
    C: ContentStore,
{
    pub fn new(records: S, content: C) -> Self {
        Self::with_probe(records, content, FrameDurationProbe)
    }
}

impl<S, C, P> TrackIngestor<S, C, P>
where
    S: TrackRecordStore,
    C: ContentStore,
    P: DurationProbe,
{
    pub fn with_probe(records: S, content: C, probe: P) -> Self {
        Self {
            records,
            content,
            probe,
            locks: TrackLocks::default(),
        }
    }

    pub fn records(&self) -> &S {
        &self.records
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn get(&self, id: TrackId) -> Result<TrackRecord, IngestError> {
        Ok(self.records.get(id)?)
    }

    pub fn list(&self, order: TrackOrder) -> Result<Vec<TrackRecord>, IngestError> {
        Ok(self.records.list(order)?)
    }

    /// Stores the uploaded file and creates a record for it.
    ///
    /// On failure nothing is left behind: no record, and the written object is removed.
    pub fn create<R: Read>(
        &self,
        upload: TrackUpload<R>,
        cancel: &Cancellation,
    ) -> Result<TrackRecord, IngestError> {
        debug!("create: {}", Stage::Validating);
        let release = upload.validate()?;
        let Some(file) = upload.file else {
            return Err(IngestError::Validation("file is required".into()));
        };

        debug!("create: {}", Stage::Classifying);
        let format = classify(&file.file_name)?;

        let stored = self.store_file(format, file, cancel)?;

        debug!("create: {}", Stage::PersistingRecord);
        let new = NewTrackRecord {
            name: upload.name,
            release,
            file_key: stored.key,
            size_bytes: stored.size_bytes,
            duration: stored.duration,
        };

        let persisted = cancel
            .check()
            .map_err(IngestError::from)
            .and_then(|_| self.records.create(&new).map_err(IngestError::from));

        match persisted {
            Ok(id) => {
                info!(
                    "created track {id} '{}' ({} bytes, {})",
                    new.name, new.size_bytes, new.duration
                );
                Ok(new.with_id(id))
            }
            Err(e) => {
                self.discard(&new.file_key, Stage::PersistingRecord, &e);
                Err(e)
            }
        }
    }

    /// Updates name and release date, and replaces the stored file when one is uploaded.
    ///
    /// Without a file the previous file key, size and duration are kept. With a file the
    /// new object is written under a new key, the record is switched to it, and only then
    /// is the previous object removed. Any failure before the switch leaves the previous
    /// record and object untouched.
    pub fn update<R: Read>(
        &self,
        id: TrackId,
        upload: TrackUpload<R>,
        cancel: &Cancellation,
    ) -> Result<TrackRecord, IngestError> {
        debug!("update {id}: {}", Stage::Validating);
        let release = upload.validate()?;

        let file = match upload.file {
            Some(file) => {
                debug!("update {id}: {}", Stage::Classifying);
                let format = classify(&file.file_name)?;
                Some((format, file))
            }
            None => None,
        };

        let _guard = self.locks.lock(id);
        let current = self.records.get(id)?;

        let Some((format, file)) = file else {
            let updated = TrackRecord {
                name: upload.name,
                release,
                ..current
            };
            debug!("update {id}: {}", Stage::PersistingRecord);
            cancel.check()?;
            self.records.update(&updated)?;
            info!("updated track {id} metadata");
            return Ok(updated);
        };

        let stored = self.store_file(format, file, cancel)?;

        debug!("update {id}: {}", Stage::PersistingRecord);
        let updated = TrackRecord {
            id,
            name: upload.name,
            release,
            file_key: stored.key,
            size_bytes: stored.size_bytes,
            duration: stored.duration,
        };

        let persisted = cancel
            .check()
            .map_err(IngestError::from)
            .and_then(|_| self.records.update(&updated).map_err(IngestError::from));
        if let Err(e) = persisted {
            self.discard(&updated.file_key, Stage::PersistingRecord, &e);
            return Err(e);
        }

        if !current.file_key.is_empty() && current.file_key != updated.file_key {
            debug!("update {id}: {}", Stage::RemovingPrevious);
            self.remove_best_effort(&current.file_key);
        }

        info!(
            "updated track {id} with new file ({} bytes, {})",
            updated.size_bytes, updated.duration
        );
        Ok(updated)
    }

    /// Removes the stored file, then the record.
    ///
    /// A failed file removal is logged and does not stop the record deletion. A failed
    /// record deletion is reported, leaving a record that points at a missing object.
    pub fn delete(&self, id: TrackId) -> Result<(), IngestError> {
        let _guard = self.locks.lock(id);
        let current = self.records.get(id)?;

        if !current.file_key.is_empty() {
            self.remove_best_effort(&current.file_key);
        }

        if let Err(e) = self.records.delete(id) {
            error!(
                "track {id} could not be deleted after its file '{}' was removed, \
                 the record needs repair: {e}",
                current.file_key
            );
            return Err(e.into());
        }

        info!("deleted track {id}");
        Ok(())
    }

    /// Writes the upload under a fresh key, then decodes the written object.
    ///
    /// The object is removed again if either step fails.
    fn store_file<R: Read>(
        &self,
        format: SupportedFormat,
        file: FileUpload<R>,
        cancel: &Cancellation,
    ) -> Result<StoredFile, IngestError> {
        let FileUpload {
            file_name,
            len,
            mut reader,
        } = file;
        let key = content_key(&file_name);

        debug!("{}: '{file_name}' as {format} to '{key}'", Stage::WritingBytes);
        let written = self
            .content
            .write(&key, &mut reader, cancel)
            .and_then(|written| {
                if written == len {
                    Ok(written)
                } else {
                    Err(ContentError::Truncated {
                        key: key.clone(),
                        expected: len,
                        written,
                    })
                }
            })
            .map_err(IngestError::from);
        let size_bytes = match written {
            Ok(written) => written,
            Err(e) => {
                self.discard(&key, Stage::WritingBytes, &e);
                return Err(e);
            }
        };

        debug!("{}: '{key}'", Stage::ExtractingDuration);
        let duration = self
            .content
            .open(&key)
            .map_err(IngestError::from)
            .and_then(|object| {
                self.probe
                    .probe(format, object, cancel)
                    .map_err(IngestError::from)
            });

        match duration {
            Ok(duration) => Ok(StoredFile {
                key,
                size_bytes,
                duration,
            }),
            Err(e) => {
                self.discard(&key, Stage::ExtractingDuration, &e);
                Err(e)
            }
        }
    }

    /// compensation for an object written earlier in a failed operation
    fn discard(&self, key: &str, stage: Stage, cause: &IngestError) {
        warn!("{stage} failed ({cause}), removing content object '{key}'");
        self.remove_best_effort(key);
    }

    fn remove_best_effort(&self, key: &str) {
        match self.content.remove(key) {
            Ok(()) => debug!("removed content object '{key}'"),
            Err(e) if e.is_not_found() => debug!("content object '{key}' already absent"),
            Err(e) => warn!("failed to remove content object '{key}': {e}"),
        }
    }
}
