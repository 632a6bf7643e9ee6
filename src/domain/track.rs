use std::{fmt::Display, str::FromStr, time::Duration};

use anyhow::{Context, anyhow, bail};
use chrono::NaiveDate;
use uuid::Uuid;

/// Date format of release dates, both on input and in the database
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Represents the track ID.
///
/// Generated by the record store when a track is created and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub Uuid);

impl TrackId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .with_context(|| format!("'{s}' is not a valid track id"))
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback length of a track, kept in whole seconds.
///
/// Displays as zero padded `HH:MM:SS`. Hours do not roll over into days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PlaybackDuration {
    secs: u64,
}

impl PlaybackDuration {
    pub fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    pub fn as_secs(&self) -> u64 {
        self.secs
    }
}

impl From<Duration> for PlaybackDuration {
    /// truncates sub-second precision
    fn from(d: Duration) -> Self {
        Self::from_secs(d.as_secs())
    }
}

impl Display for PlaybackDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hours = self.secs / 3600;
        let minutes = (self.secs / 60) % 60;
        let seconds = self.secs % 60;
        write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
    }
}

impl FromStr for PlaybackDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.split(':').collect::<Vec<_>>();
        let [h, m, sec] = parts.as_slice() else {
            bail!("duration '{s}' is not in HH:MM:SS form");
        };

        let field = |v: &str| {
            v.parse::<u64>()
                .map_err(|e| anyhow!("duration '{s}' has invalid component '{v}': {e}"))
        };
        let (h, m, sec) = (field(*h)?, field(*m)?, field(*sec)?);
        if m >= 60 || sec >= 60 {
            bail!("duration '{s}' has minutes or seconds out of range");
        }

        Ok(Self::from_secs(h * 3600 + m * 60 + sec))
    }
}

/// Persisted track metadata.
///
/// Whenever `file_key` is non-empty the content store holds an object under that key
/// whose size is `size_bytes` and whose decoded length is `duration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub id: TrackId,
    pub name: String,
    pub release: NaiveDate,
    pub file_key: String,
    pub size_bytes: u64,
    pub duration: PlaybackDuration,
}

/// Everything about a track except its id, which the record store assigns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrackRecord {
    pub name: String,
    pub release: NaiveDate,
    pub file_key: String,
    pub size_bytes: u64,
    pub duration: PlaybackDuration,
}

impl NewTrackRecord {
    pub fn with_id(self, id: TrackId) -> TrackRecord {
        TrackRecord {
            id,
            name: self.name,
            release: self.release,
            file_key: self.file_key,
            size_bytes: self.size_bytes,
            duration: self.duration,
        }
    }
}

pub fn parse_release_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), RELEASE_DATE_FORMAT)
        .with_context(|| format!("release date '{s}' is not in YYYY-MM-DD form"))
}
