// src/session/store.rs — Durable storage for the single session record
//
// The record lives under one well-known key (`viralDailyUser`). Writes are
// full-record replaces; clearing removes the key. The store deals only in
// serialized text: decoding and corruption handling belong to the manager.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::infra::errors::ViralDailyError;
use crate::infra::paths;

pub trait SessionStore: Send + Sync {
    /// Raw record, or `None` when the key is absent.
    fn read(&self) -> Result<Option<String>, ViralDailyError>;
    fn write(&self, record: &str) -> Result<(), ViralDailyError>;
    fn remove(&self) -> Result<(), ViralDailyError>;
}

/// Session record kept as a JSON file (chmod 600 on Unix).
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/viralDailyUser.json`
    pub fn default_location() -> Self {
        Self::new(paths::session_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> Result<Option<String>, ViralDailyError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write: temp file, chmod, rename.
    fn write(&self, record: &str) -> Result<(), ViralDailyError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, record)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), ViralDailyError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: impl Into<String>) -> Self {
        Self {
            record: Mutex::new(Some(record.into())),
        }
    }

    /// Current raw record.
    pub fn snapshot(&self) -> Option<String> {
        self.record.lock().ok().and_then(|r| r.clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> Result<Option<String>, ViralDailyError> {
        Ok(self.snapshot())
    }

    fn write(&self, record: &str) -> Result<(), ViralDailyError> {
        let mut slot = self
            .record
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        *slot = Some(record.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), ViralDailyError> {
        let mut slot = self
            .record
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}
