use std::io::{Empty, Read};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{domain::track::parse_release_date, ingest::error::IngestError};

/// Uploaded audio file as handed over by the request layer
#[derive(Debug)]
pub struct FileUpload<R> {
    /// original file name, only used to classify the format and derive the storage key
    pub file_name: String,
    /// declared length in bytes
    pub len: u64,
    pub reader: R,
}

/// Input of a create or update call. Not persisted.
#[derive(Debug)]
pub struct TrackUpload<R> {
    pub name: String,
    /// `YYYY-MM-DD`
    pub release: String,
    /// required on create, optional on update
    pub file: Option<FileUpload<R>>,
}

impl<R: Read> TrackUpload<R> {
    pub fn new(name: impl Into<String>, release: impl Into<String>, file: FileUpload<R>) -> Self {
        Self {
            name: name.into(),
            release: release.into(),
            file: Some(file),
        }
    }

    /// Checks the fields that need no I/O and returns the parsed release date
    pub(crate) fn validate(&self) -> Result<NaiveDate, IngestError> {
        if self.name.trim().is_empty() {
            return Err(IngestError::Validation("name is required".into()));
        }

        let release = parse_release_date(&self.release)
            .map_err(|e| IngestError::Validation(format!("{e:#}")))?;

        if let Some(file) = &self.file {
            if file.file_name.trim().is_empty() {
                return Err(IngestError::Validation("file name is required".into()));
            }
        }

        Ok(release)
    }
}

impl TrackUpload<Empty> {
    /// update that keeps the stored file
    pub fn metadata_only(name: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release: release.into(),
            file: None,
        }
    }
}

/// Derives a fresh content key from the uploaded file name.
///
/// Only the last path component survives, bytes outside `[A-Za-z0-9._-]` become `_`,
/// and a random prefix keeps keys of equally named uploads apart.
pub(crate) fn content_key(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    // sanitized above, so every char is a single byte
    let base = base.trim_start_matches('.');
    let base = if base.is_empty() { "upload" } else { base };

    format!("{}-{}", Uuid::new_v4().simple(), shorten(base))
}

/// Longest file name part of a key, well below the usual 255 byte name limit
const MAX_KEY_BASE_LEN: usize = 200;

/// Cuts a sanitized name down to [`MAX_KEY_BASE_LEN`] bytes, keeping a short extension
fn shorten(base: &str) -> String {
    if base.len() <= MAX_KEY_BASE_LEN {
        return base.to_string();
    }
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < 16 => {
            let keep = MAX_KEY_BASE_LEN - ext.len() - 1;
            format!("{}.{ext}", &stem[..keep])
        }
        _ => base[..MAX_KEY_BASE_LEN].to_string(),
    }
}
