pub mod audio;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod storage;
pub mod view;
