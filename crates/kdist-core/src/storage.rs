// ── Session persistence ──
//
// The session record is rewritten on every login, logout and base-URL
// change, and read once at startup. Storage backends are pluggable so the
// CLI can keep the key in the OS keyring while tests stay in memory.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_BASE_URL;
use crate::error::CoreError;

/// The persisted session record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub access_key: String,
    #[serde(default = "default_base_url_string")]
    pub base_url: String,
}

fn default_base_url_string() -> String {
    DEFAULT_BASE_URL.to_owned()
}

impl Default for PersistedSession {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            access_key: String::new(),
            base_url: default_base_url_string(),
        }
    }
}

impl fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedSession")
            .field("is_authenticated", &self.is_authenticated)
            .field(
                "access_key",
                &if self.access_key.is_empty() { "" } else { "<redacted>" },
            )
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Where the session record lives between runs.
pub trait SessionStorage: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<PersistedSession>, CoreError>;

    fn save(&self, session: &PersistedSession) -> Result<(), CoreError>;
}

// ── In-memory ────────────────────────────────────────────────────────

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the storage, as if a previous run had saved `session`.
    pub fn with(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    /// The last saved record.
    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>, CoreError> {
        let slot = self.slot.lock().map_err(|_| CoreError::Storage {
            message: "session storage lock poisoned".into(),
        })?;
        Ok(slot.clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), CoreError> {
        let mut slot = self.slot.lock().map_err(|_| CoreError::Storage {
            message: "session storage lock poisoned".into(),
        })?;
        *slot = Some(session.clone());
        Ok(())
    }
}

// ── JSON file ────────────────────────────────────────────────────────

/// A JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, action: &str, err: impl fmt::Display) -> CoreError {
        CoreError::Storage {
            message: format!("failed to {action} {}: {err}", self.path.display()),
        }
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>, CoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no saved session");
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| self.storage_err("read", e))?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let session =
            serde_json::from_str(&contents).map_err(|e| self.storage_err("parse", e))?;
        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), CoreError> {
        let json =
            serde_json::to_vec_pretty(session).map_err(|e| self.storage_err("encode", e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.storage_err("create directory for", e))?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = open_private(&tmp).map_err(|e| self.storage_err("write", e))?;
            file.write_all(&json)
                .and_then(|()| file.sync_all())
                .map_err(|e| self.storage_err("write", e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.storage_err("replace", e))?;

        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}

/// Create or truncate `path`, readable only by the owner where supported.
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut opts = fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn authed() -> PersistedSession {
        PersistedSession {
            is_authenticated: true,
            access_key: "ak-test123".into(),
            base_url: "https://staging.test".into(),
        }
    }

    #[test]
    fn record_uses_camel_case_keys() {
        let json = serde_json::to_value(authed()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "isAuthenticated": true,
                "accessKey": "ak-test123",
                "baseUrl": "https://staging.test"
            })
        );
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: PersistedSession = serde_json::from_str("{}").unwrap();
        assert_eq!(s, PersistedSession::default());
        assert_eq!(s.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn debug_hides_the_key() {
        let dbg = format!("{:?}", authed());
        assert!(!dbg.contains("ak-test123"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn file_storage_roundtrip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("session.json"));

        assert_eq!(storage.load().unwrap(), None);
        storage.save(&authed()).unwrap();
        assert_eq!(storage.load().unwrap(), Some(authed()));
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileStorage::new(&path).load().unwrap_err();
        assert!(matches!(err, CoreError::Storage { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));
        storage.save(&authed()).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_storage_keeps_last_save() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load().unwrap(), None);
        storage.save(&authed()).unwrap();
        assert_eq!(storage.snapshot(), Some(authed()));
    }
}
