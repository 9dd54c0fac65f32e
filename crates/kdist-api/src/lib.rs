// kdist-api: Async Rust client for the distributor backend REST API
//
// Every backend call flows through `ApiClient`, which owns the access key and
// base URL, injects the `X-Access-Key` header and folds every failure into
// `Error::Network` or `Error::Api`.

pub mod access_key;
pub mod client;
pub mod endpoints;
pub mod error;
pub mod method;
pub mod models;
pub mod transport;

pub use access_key::{ACCESS_KEY_PREFIX, AccessKey, AccessKeyError, Validation, validate};
pub use client::{ACCESS_KEY_HEADER, ApiClient, RawExchange, RequestOptions, parse_base_url};
pub use endpoints::paths;
pub use error::{Error, ErrorCode};
pub use method::HttpMethod;
pub use transport::{DEFAULT_TIMEOUT, TlsMode, TransportConfig};
