// kdist-core: Session, query cache and distributor workflows between
// kdist-api and the CLI.

pub mod config;
pub mod console;
pub mod error;
pub mod grant;
pub mod health;
pub mod query;
pub mod session;
pub mod stats;
pub mod storage;
pub mod tester;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ClientConfig, DEFAULT_BASE_URL, default_base_url};
pub use console::Console;
pub use error::CoreError;
pub use grant::{FieldError, GrantWizard, WizardStep};
pub use health::{ProbeResult, ProbeStatus, StatusBoard, StatusReport, StatusSummary};
pub use query::{Mutation, MutationState, QueryClient, QueryKey, QueryOptions, QueryState, RetryPolicy};
pub use session::{AuthState, Session, SessionSnapshot};
pub use stats::DashboardStats;
pub use storage::{FileStorage, MemoryStorage, PersistedSession, SessionStorage};
pub use tester::ManualRequest;

// The API crate's models are part of this crate's public surface.
pub use kdist_api::models;
pub use kdist_api::{
    AccessKey, ApiClient, HttpMethod, RawExchange, RequestOptions, TlsMode, parse_base_url,
};
