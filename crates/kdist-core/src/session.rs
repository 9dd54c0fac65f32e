// ── Auth session ──
//
// Single source of truth for "who is logged in, against which backend".
// The session is the only writer of the API client's key and base URL;
// every state change is published on a `watch` channel and persisted.

use std::fmt;
use std::sync::Arc;

use strum::Display;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use kdist_api::{AccessKey, ApiClient, parse_base_url};

use crate::config::default_base_url;
use crate::error::CoreError;
use crate::storage::{PersistedSession, SessionStorage};

// ── AuthState ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

/// Observable session state.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub access_key: Option<AccessKey>,
    pub base_url: Url,
}

impl SessionSnapshot {
    fn anonymous(base_url: Url) -> Self {
        Self {
            state: AuthState::Anonymous,
            access_key: None,
            base_url,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            is_authenticated: self.is_authenticated(),
            access_key: self
                .access_key
                .as_ref()
                .map(|k| k.expose().to_owned())
                .unwrap_or_default(),
            base_url: self.base_url.to_string(),
        }
    }
}

impl fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("state", &self.state)
            .field("access_key", &self.access_key)
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Cheaply cloneable handle to the session store.
///
/// Operations are serialized by the caller; concurrent `login` calls race
/// on last-writer-wins. In-flight requests are never cancelled by a state
/// change.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: Arc<ApiClient>,
    storage: Arc<dyn SessionStorage>,
    state: watch::Sender<SessionSnapshot>,
}

impl Session {
    /// A fresh anonymous session pointed at the client's current base URL.
    /// Nothing is loaded or saved.
    pub fn new(api: Arc<ApiClient>, storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::anonymous(api.base_url()));
        Self {
            inner: Arc::new(SessionInner {
                api,
                storage,
                state,
            }),
        }
    }

    /// Rebuild the session saved by a previous run.
    ///
    /// A record marked authenticated with a non-empty key is trusted: the key
    /// is handed to the client without the login-time validation, so a key
    /// saved under an older format keeps working until the backend refuses
    /// it. Unreadable storage is logged and treated as empty.
    pub fn restore(api: Arc<ApiClient>, storage: Arc<dyn SessionStorage>) -> Self {
        let session = Self::new(api, storage);

        let persisted = match session.inner.storage.load() {
            Ok(Some(p)) => p,
            Ok(None) => return session,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable saved session");
                return session;
            }
        };

        let base_url = match parse_base_url(&persisted.base_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(base_url = %persisted.base_url, error = %e, "saved base URL is invalid, using default");
                default_base_url()
            }
        };

        let access_key = persisted.access_key.trim();
        if !persisted.is_authenticated || access_key.is_empty() {
            session.inner.api.set_base_url(base_url.clone());
            session.publish(SessionSnapshot::anonymous(base_url));
            return session;
        }

        let key = AccessKey::trusted(access_key);
        session.inner.api.configure_key(key.clone(), base_url.clone());
        debug!(base_url = %base_url, "restored authenticated session");
        session.publish(SessionSnapshot {
            state: AuthState::Authenticated,
            access_key: Some(key),
            base_url,
        });
        session
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Validate `access_key`, configure the client and mark the session
    /// authenticated.
    ///
    /// An invalid key fails with [`CoreError::InvalidAccessKey`] and leaves
    /// the session untouched. A storage failure is reported after the
    /// in-memory state has already switched.
    pub fn login(&self, access_key: &str, base_url: &str) -> Result<(), CoreError> {
        let key = AccessKey::parse(access_key)?;
        let url = parse_base_url(base_url)?;

        self.inner.api.configure_key(key.clone(), url.clone());
        info!(base_url = %url, key = %key.masked(), "logged in");

        self.publish(SessionSnapshot {
            state: AuthState::Authenticated,
            access_key: Some(key),
            base_url: url,
        });
        self.persist()
    }

    /// Forget the key and reset to the default backend. Always succeeds.
    pub fn logout(&self) {
        self.inner.api.clear();
        let url = default_base_url();
        self.inner.api.set_base_url(url.clone());
        self.publish(SessionSnapshot::anonymous(url));
        info!("logged out");

        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to persist logout");
        }
    }

    /// Point the session at another backend, keeping the current key.
    pub fn update_base_url(&self, base_url: &str) -> Result<(), CoreError> {
        let url = parse_base_url(base_url)?;
        let mut snapshot = self.snapshot();

        match snapshot.access_key {
            Some(ref key) if snapshot.is_authenticated() => {
                self.inner.api.configure_key(key.clone(), url.clone());
            }
            _ => self.inner.api.set_base_url(url.clone()),
        }
        debug!(base_url = %url, "base URL updated");

        snapshot.base_url = url;
        self.publish(snapshot);
        self.persist()
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn base_url(&self) -> Url {
        self.inner.state.borrow().base_url.clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// The API client this session configures.
    pub fn api(&self) -> &Arc<ApiClient> {
        &self.inner.api
    }

    /// The client, if the session is authenticated.
    pub fn authenticated_api(&self) -> Result<&ApiClient, CoreError> {
        if self.is_authenticated() {
            Ok(&self.inner.api)
        } else {
            Err(CoreError::NotAuthenticated)
        }
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.inner.state.send_replace(snapshot);
    }

    fn persist(&self) -> Result<(), CoreError> {
        self.inner.storage.save(&self.snapshot().to_persisted())
    }
}
