//! Durable byte media backing the JSON stores.

use crate::core::MediumError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::fs;

/// Whole-object storage: read everything, overwrite everything, or ask
/// whether the object is there at all.
#[async_trait]
pub trait Medium: Send + Sync + fmt::Debug {
    async fn read(&self) -> Result<Vec<u8>, MediumError>;

    /// Replaces the whole object with `bytes`.
    async fn write(&self, bytes: Vec<u8>) -> Result<(), MediumError>;

    async fn exists(&self) -> Result<bool, MediumError>;

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}

/// Local file, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileMedium {
    path: PathBuf,
}

impl FileMedium {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the target named `<file name>.tmp`, so distinct targets
    /// never share one.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> MediumError {
        MediumError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl Medium for FileMedium {
    async fn read(&self) -> Result<Vec<u8>, MediumError> {
        fs::read(&self.path).await.map_err(|err| self.io_error(err))
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<(), MediumError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, bytes)
            .await
            .map_err(|err| self.io_error(err))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        Ok(())
    }

    async fn exists(&self) -> Result<bool, MediumError> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

/// Process-local medium. Clones share the same object, so a store can be
/// closed and reopened over it.
#[derive(Debug, Clone, Default)]
pub struct MemoryMedium {
    object: Arc<Mutex<Option<Vec<u8>>>>,
    read_only: Arc<AtomicBool>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Medium that already holds `bytes`.
    pub fn with_contents(bytes: impl Into<Vec<u8>>) -> Self {
        let medium = Self::new();
        if let Ok(mut object) = medium.object.lock() {
            *object = Some(bytes.into());
        }
        medium
    }

    /// Makes every later write fail with `PermissionDenied`.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.object.lock().ok().and_then(|object| object.clone())
    }

    fn error(&self, kind: io::ErrorKind, message: &str) -> MediumError {
        MediumError::Io {
            path: self.describe(),
            source: io::Error::new(kind, message.to_string()),
        }
    }
}

#[async_trait]
impl Medium for MemoryMedium {
    async fn read(&self) -> Result<Vec<u8>, MediumError> {
        let object = self
            .object
            .lock()
            .map_err(|_| self.error(io::ErrorKind::Other, "memory medium poisoned"))?;
        object
            .clone()
            .ok_or_else(|| self.error(io::ErrorKind::NotFound, "object does not exist"))
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<(), MediumError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(self.error(io::ErrorKind::PermissionDenied, "medium is read-only"));
        }
        let mut object = self
            .object
            .lock()
            .map_err(|_| self.error(io::ErrorKind::Other, "memory medium poisoned"))?;
        *object = Some(bytes);
        Ok(())
    }

    async fn exists(&self) -> Result<bool, MediumError> {
        let object = self
            .object
            .lock()
            .map_err(|_| self.error(io::ErrorKind::Other, "memory medium poisoned"))?;
        Ok(object.is_some())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
