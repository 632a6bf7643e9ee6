//! Presentation of stored tracks

use serde::{Deserialize, Serialize};

use crate::domain::track::{RELEASE_DATE_FORMAT, TrackRecord};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackView {
    pub id: String,
    pub name: String,
    pub release: String,
    /// human readable, see [`format_bytes`]
    pub size: String,
    /// `HH:MM:SS`
    pub duration: String,
}

impl TrackView {
    pub fn from_domain(track: &TrackRecord) -> Self {
        Self {
            id: track.id.to_string(),
            name: track.name.clone(),
            release: track.release.format(RELEASE_DATE_FORMAT).to_string(),
            size: format_bytes(track.size_bytes),
            duration: track.duration.to_string(),
        }
    }
}

const UNITS: [(&str, u32); 6] = [
    ("EB", 60),
    ("PB", 50),
    ("TB", 40),
    ("GB", 30),
    ("MB", 20),
    ("KB", 10),
];

/// Binary prefixed size with two decimals, plain bytes below 1 KB
pub fn format_bytes(bytes: u64) -> String {
    for (unit, shift) in UNITS {
        let threshold = 1u64 << shift;
        if bytes >= threshold {
            return format!("{:.2} {unit}", bytes as f64 / threshold as f64);
        }
    }
    format!("{bytes} B")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::track::{PlaybackDuration, TrackId};

    #[test]
    fn test_format_bytes_thresholds() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(900), "900 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 << 30), "3.00 GB");
        assert_eq!(format_bytes(1 << 40), "1.00 TB");
        assert_eq!(format_bytes(1 << 50), "1.00 PB");
        assert_eq!(format_bytes(u64::MAX), "16.00 EB");
    }

    #[test]
    fn test_view_from_record() -> anyhow::Result<()> {
        let id = TrackId::generate();
        let track = TrackRecord {
            id,
            name: "Song2".into(),
            release: NaiveDate::from_ymd_opt(2021, 11, 15).unwrap(),
            file_key: "k-song.mp3".into(),
            size_bytes: 900,
            duration: PlaybackDuration::from_secs(204),
        };

        let view = TrackView::from_domain(&track);
        assert_eq!(view.id, id.to_string());
        assert_eq!(view.release, "2021-11-15");
        assert_eq!(view.size, "900 B");
        assert_eq!(view.duration, "00:03:24");

        let json: serde_json::Value = serde_json::to_value(&view)?;
        assert_eq!(json["name"], "Song2");
        assert!(json.get("file_key").is_none());
        Ok(())
    }
}
