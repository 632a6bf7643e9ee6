pub mod content;
pub mod db;
pub mod error;
pub mod records;
pub(crate) mod schema;
