use rusqlite::Connection;

pub mod tables {
    pub const TRACKS: &str = "tracks";

    pub const ALL_TABLES: &[&str] = &[TRACKS];
}

pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const RELEASE_DATE: &str = "release_date";
    pub const FILE_KEY: &str = "file_key";
    pub const SIZE: &str = "size";
    pub const DURATION: &str = "duration";
}

pub use tables::*;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tracks (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    release_date TEXT NOT NULL,
    file_key TEXT NOT NULL,
    size INTEGER NOT NULL,
    duration TEXT NOT NULL
);
"#;

pub fn init(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}
