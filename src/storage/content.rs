//! Durable byte storage for uploaded audio, addressed by string keys

use std::{
    fs::File,
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use crate::{cancel::Cancellation, storage::error::ContentError};

const COPY_CHUNK: usize = 64 * 1024;

/// Byte objects addressed by a caller chosen key.
///
/// Each single write or remove is atomic from the store's point of view,
/// nothing is atomic across calls.
pub trait ContentStore: Send + Sync {
    type Reader: Read + Send + Sync + 'static;

    /// Creates or truncates the object at `key` and copies all of `source` into it.
    ///
    /// Returns the number of bytes written. After an error the object may be
    /// missing or partially written.
    fn write(
        &self,
        key: &str,
        source: &mut dyn Read,
        cancel: &Cancellation,
    ) -> Result<u64, ContentError>;

    fn open(&self, key: &str) -> Result<Self::Reader, ContentError>;

    /// Removing a missing key is an error, see [`ContentError::is_not_found`]
    fn remove(&self, key: &str) -> Result<(), ContentError>;
}

/// Content store keeping one file per key inside a root directory
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// creates the root directory if it does not exist yet
    pub fn new<P: AsRef<Path>>(root: P) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are single path components, anything that could escape the root is rejected
    pub fn path_for(&self, key: &str) -> Result<PathBuf, ContentError> {
        let invalid = key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\', '\0']);
        if invalid {
            return Err(ContentError::io(
                key,
                std::io::Error::new(ErrorKind::InvalidInput, "invalid content key"),
            ));
        }
        Ok(self.root.join(key))
    }
}

impl ContentStore for FsContentStore {
    type Reader = File;

    fn write(
        &self,
        key: &str,
        source: &mut dyn Read,
        cancel: &Cancellation,
    ) -> Result<u64, ContentError> {
        let path = self.path_for(key)?;
        let mut file = File::create(&path).map_err(|e| ContentError::io(key, e))?;

        let mut buf = vec![0u8; COPY_CHUNK];
        let mut written: u64 = 0;
        loop {
            cancel.check()?;

            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ContentError::io(key, e)),
            };
            file.write_all(&buf[..n])
                .map_err(|e| ContentError::io(key, e))?;
            written += n as u64;
        }

        file.sync_all().map_err(|e| ContentError::io(key, e))?;
        log::debug!("wrote {written} bytes to {}", path.to_string_lossy());
        Ok(written)
    }

    fn open(&self, key: &str) -> Result<File, ContentError> {
        let path = self.path_for(key)?;
        File::open(path).map_err(|e| ContentError::io(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), ContentError> {
        let path = self.path_for(key)?;
        std::fs::remove_file(path).map_err(|e| ContentError::io(key, e))
    }
}
