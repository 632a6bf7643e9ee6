pub mod format;
pub mod track;
