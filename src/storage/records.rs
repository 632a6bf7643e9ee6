//! Relational persistence of track metadata

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row, params};

use crate::{
    config,
    domain::track::{NewTrackRecord, PlaybackDuration, RELEASE_DATE_FORMAT, TrackId, TrackRecord},
    storage::{
        db,
        error::StorageError,
        schema::{columns::*, tables::*},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackOrder {
    /// order in which tracks were created
    #[default]
    Added,
    /// oldest release first
    Release,
}

/// Track metadata keyed by track id. Every call is a single row operation.
pub trait TrackRecordStore: Send + Sync {
    fn get(&self, id: TrackId) -> Result<TrackRecord, StorageError>;

    /// Stores a fully populated record under a freshly generated id
    fn create(&self, record: &NewTrackRecord) -> Result<TrackId, StorageError>;

    /// Replaces every field of the record with the same id
    fn update(&self, record: &TrackRecord) -> Result<(), StorageError>;

    fn delete(&self, id: TrackId) -> Result<(), StorageError>;

    fn list(&self, order: TrackOrder) -> Result<Vec<TrackRecord>, StorageError>;
}

/// SQLite implementation, one connection shared behind a mutex
pub struct SqliteTrackStore {
    db: Mutex<rusqlite::Connection>,
}

impl SqliteTrackStore {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database) -> Result<Self, StorageError> {
        let db = db::open(db_config)?;
        Ok(Self::from_existing_conn(db))
    }

    pub fn from_existing_conn(db: rusqlite::Connection) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

const SELECT_TRACK: &str = "SELECT id, name, release_date, file_key, size, duration FROM tracks";

/// Row columns before validation, so conversion errors are reported as ours and not rusqlite's
struct RawTrackRow {
    id: String,
    name: String,
    release: String,
    file_key: String,
    size: i64,
    duration: String,
}

impl RawTrackRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            release: row.get(2)?,
            file_key: row.get(3)?,
            size: row.get(4)?,
            duration: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<TrackRecord, StorageError> {
        let id = TrackId::parse(&self.id).map_err(|_| StorageError::InvalidTrackId)?;
        let release = NaiveDate::parse_from_str(&self.release, RELEASE_DATE_FORMAT)
            .with_context(|| format!("track {id} has malformed release date '{}'", self.release))?;
        let size_bytes = u64::try_from(self.size)
            .with_context(|| format!("track {id} has negative size {}", self.size))?;
        let duration = self
            .duration
            .parse::<PlaybackDuration>()
            .with_context(|| format!("track {id} has malformed duration"))?;

        Ok(TrackRecord {
            id,
            name: self.name,
            release,
            file_key: self.file_key,
            size_bytes,
            duration,
        })
    }
}

fn size_to_sql(size: u64) -> Result<i64, StorageError> {
    i64::try_from(size)
        .map_err(|_| StorageError::Internal(anyhow!("size {size} does not fit the database")))
}

fn release_to_sql(release: NaiveDate) -> String {
    release.format(RELEASE_DATE_FORMAT).to_string()
}

impl TrackRecordStore for SqliteTrackStore {
    fn get(&self, id: TrackId) -> Result<TrackRecord, StorageError> {
        let raw = self
            .conn()
            .query_row(
                &format!("{SELECT_TRACK} WHERE {ID} = ?1"),
                params![id.to_string()],
                RawTrackRow::from_row,
            )
            .optional()?;

        match raw {
            Some(raw) => raw.into_record(),
            None => Err(StorageError::TrackNotFound(id)),
        }
    }

    fn create(&self, record: &NewTrackRecord) -> Result<TrackId, StorageError> {
        let id = TrackId::generate();
        let size = size_to_sql(record.size_bytes)?;

        self.conn().execute(
            &format!(
                "INSERT INTO {TRACKS} ({ID}, {NAME}, {RELEASE_DATE}, {FILE_KEY}, {SIZE}, {DURATION})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                id.to_string(),
                record.name,
                release_to_sql(record.release),
                record.file_key,
                size,
                record.duration.to_string(),
            ],
        )?;

        Ok(id)
    }

    fn update(&self, record: &TrackRecord) -> Result<(), StorageError> {
        let size = size_to_sql(record.size_bytes)?;

        let changed = self.conn().execute(
            &format!(
                "UPDATE {TRACKS}
                 SET {NAME} = ?2, {RELEASE_DATE} = ?3, {FILE_KEY} = ?4, {SIZE} = ?5, {DURATION} = ?6
                 WHERE {ID} = ?1"
            ),
            params![
                record.id.to_string(),
                record.name,
                release_to_sql(record.release),
                record.file_key,
                size,
                record.duration.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::TrackNotFound(record.id));
        }
        Ok(())
    }

    fn delete(&self, id: TrackId) -> Result<(), StorageError> {
        let changed = self.conn().execute(
            &format!("DELETE FROM {TRACKS} WHERE {ID} = ?1"),
            params![id.to_string()],
        )?;

        if changed == 0 {
            return Err(StorageError::TrackNotFound(id));
        }
        Ok(())
    }

    fn list(&self, order: TrackOrder) -> Result<Vec<TrackRecord>, StorageError> {
        let order_by = match order {
            TrackOrder::Added => "rowid".to_string(),
            TrackOrder::Release => format!("{RELEASE_DATE}, rowid"),
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("{SELECT_TRACK} ORDER BY {order_by}"))?;
        let rows = stmt
            .query_map([], RawTrackRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        rows.into_iter().map(RawTrackRow::into_record).collect()
    }
}
