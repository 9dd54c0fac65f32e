// Session storage that keeps the access key in the OS keyring.
//
// The session file still records the state and base URL, but its
// `accessKey` field is always written blank.

use kdist_core::{CoreError, FileStorage, PersistedSession, SessionStorage};
use tracing::debug;

use crate::KEYRING_SERVICE;

const KEYRING_USER: &str = "access-key";

fn entry() -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
}

fn storage_error(err: &keyring::Error) -> CoreError {
    CoreError::Storage {
        message: format!("keyring: {err}"),
    }
}

/// The stored key, `Ok(None)` when the keyring has no entry.
fn read_key() -> Result<Option<String>, keyring::Error> {
    match entry()?.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e),
    }
}

fn write_key(key: &str) -> Result<(), keyring::Error> {
    entry()?.set_password(key)
}

fn delete_key() -> Result<(), keyring::Error> {
    match entry()?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e),
    }
}

/// [`FileStorage`] for the record, keyring for the secret.
#[derive(Debug)]
pub struct KeyringStorage {
    file: FileStorage,
}

impl KeyringStorage {
    pub fn new(file: FileStorage) -> Self {
        Self { file }
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self) -> Result<Option<PersistedSession>, CoreError> {
        let Some(mut session) = self.file.load()? else {
            return Ok(None);
        };
        if session.is_authenticated && session.access_key.is_empty() {
            // A missing entry leaves the key blank; restore then starts
            // anonymous.
            match read_key() {
                Ok(Some(key)) => session.access_key = key,
                Ok(None) => debug!("keyring has no access key for the saved session"),
                Err(e) => return Err(storage_error(&e)),
            }
        }
        Ok(Some(session))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), CoreError> {
        if session.is_authenticated && !session.access_key.is_empty() {
            write_key(&session.access_key).map_err(|e| storage_error(&e))?;
        } else {
            delete_key().map_err(|e| storage_error(&e))?;
        }
        let record = PersistedSession {
            access_key: String::new(),
            ..session.clone()
        };
        self.file.save(&record)
    }
}
