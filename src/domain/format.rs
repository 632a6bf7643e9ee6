//! Classifies uploaded files by extension

use std::fmt::Display;

use thiserror::Error;

/// Audio formats the catalogue accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedFormat {
    Mp3,
}

impl SupportedFormat {
    pub const ALL: &'static [SupportedFormat] = &[SupportedFormat::Mp3];

    /// lowercase file extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            SupportedFormat::Mp3 => "mp3",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|format| format.extension() == ext)
    }
}

impl Display for SupportedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupportedFormat::Mp3 => write!(f, "MP3"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("unsupported file extension '{0}'")]
    UnsupportedExtension(String),

    #[error("file name '{0}' has no extension")]
    MissingExtension(String),
}

/// Maps a file name to a supported format by the text after its last `.`, ignoring case
pub fn classify(file_name: &str) -> Result<SupportedFormat, ClassificationError> {
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => return Err(ClassificationError::MissingExtension(file_name.to_string())),
    };

    SupportedFormat::from_extension(&ext).ok_or(ClassificationError::UnsupportedExtension(ext))
}
