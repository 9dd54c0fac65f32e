// Backend HTTP client
//
// Wraps `reqwest::Client` with access-key header injection, base-URL joining
// and the `{code, message, data}` envelope. Endpoint methods live in
// `endpoints/` as inherent impls so this module stays focused on transport
// and error classification.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::access_key::{AccessKey, AccessKeyError};
use crate::error::{Error, ErrorCode};
use crate::method::HttpMethod;
use crate::models::ApiEnvelope;
use crate::transport::TransportConfig;

/// Header carrying the trimmed access key on every request.
pub const ACCESS_KEY_HEADER: &str = "X-Access-Key";

const BODY_PREVIEW_LIMIT: usize = 200;

// ── Auth snapshot ────────────────────────────────────────────────────

/// The `(access key, base URL)` pair. Swapped atomically as a whole; each
/// request loads one snapshot when it is built, so a reconfiguration only
/// affects requests issued after it.
#[derive(Debug)]
struct AuthSnapshot {
    access_key: Option<AccessKey>,
    base_url: Url,
}

// ── Request options ──────────────────────────────────────────────────

/// Query string, JSON body and extra headers for a single request.
#[derive(Debug, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    body: Option<Value>,
    headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append query parameters from any struct that serializes to a flat
    /// JSON object. `null` fields are skipped.
    pub fn query(mut self, params: &impl Serialize) -> Result<Self, Error> {
        let value = serde_json::to_value(params).map_err(|e| Error::Encode(e.to_string()))?;
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    if let Some(v) = scalar_to_string(&v) {
                        self.query.push((k, v));
                    }
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(Error::Encode(format!(
                "query parameters must be an object, got {other}"
            ))),
        }
    }

    /// Append a single query parameter.
    pub fn query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: &impl Serialize) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body).map_err(|e| Error::Encode(e.to_string()))?);
        Ok(self)
    }

    /// Attach an already-built JSON body.
    pub fn json_value(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set an extra request header. Invalid names or values are rejected.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self, Error> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Encode(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Encode(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

// ── Raw exchange ─────────────────────────────────────────────────────

/// Everything observed about one manually issued request.
///
/// `outcome` holds the same classification `request` would have applied:
/// `None` for success, `Some(Error::Api { .. })` otherwise.
#[derive(Debug)]
pub struct RawExchange {
    pub method: HttpMethod,
    pub url: String,
    pub status: u16,
    pub elapsed: Duration,
    pub content_type: Option<String>,
    /// Decoded JSON body, or the raw text wrapped in `Value::String`.
    pub body: Value,
    pub outcome: Option<Error>,
}

impl RawExchange {
    pub fn is_success(&self) -> bool {
        self.outcome.is_none()
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Single point through which every backend call flows.
///
/// Owns the mutable `(access key, base URL)` pair. Cheap to share behind an
/// `Arc`; all methods take `&self`.
pub struct ApiClient {
    http: reqwest::Client,
    auth: ArcSwap<AuthSnapshot>,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build an unauthenticated client pointed at `base_url`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            auth: ArcSwap::from_pointee(AuthSnapshot {
                access_key: None,
                base_url,
            }),
        }
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Validate `access_key` and install it together with `base_url`.
    ///
    /// The key is re-validated here even when the caller already did so.
    /// No network I/O.
    pub fn configure(&self, access_key: &str, base_url: &str) -> Result<AccessKey, Error> {
        let key = AccessKey::parse(access_key)?;
        let url = parse_base_url(base_url)?;
        self.install(Some(key.clone()), url);
        Ok(key)
    }

    /// Install an already-validated key.
    pub fn configure_key(&self, access_key: AccessKey, base_url: Url) {
        self.install(Some(access_key), base_url);
    }

    /// Forget the access key. Later requests carry no auth header.
    pub fn clear(&self) {
        let base_url = self.auth.load().base_url.clone();
        self.install(None, base_url);
        debug!("access key cleared");
    }

    /// Point at a different backend, keeping the current key.
    pub fn set_base_url(&self, base_url: Url) {
        let access_key = self.auth.load().access_key.clone();
        self.install(access_key, base_url);
    }

    fn install(&self, access_key: Option<AccessKey>, base_url: Url) {
        debug!(base_url = %base_url, has_key = access_key.is_some(), "client configured");
        self.auth.store(Arc::new(AuthSnapshot {
            access_key,
            base_url,
        }));
    }

    /// The current backend base URL.
    pub fn base_url(&self) -> Url {
        self.auth.load().base_url.clone()
    }

    /// Whether an access key is installed.
    pub fn is_configured(&self) -> bool {
        self.auth.load().access_key.is_some()
    }

    /// The installed key in masked form, for status output.
    pub fn access_key_masked(&self) -> Option<String> {
        self.auth.load().access_key.as_ref().map(AccessKey::masked)
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Issue one request and return the envelope's decoded `data`.
    ///
    /// Every failure is classified as exactly one of:
    /// - [`Error::Network`]: no response arrived;
    /// - [`Error::Api`] with the HTTP status: non-2xx response;
    /// - [`Error::Api`] with the body code: 2xx but `code != 0`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        opts: RequestOptions,
    ) -> Result<T, Error> {
        let (builder, url) = self.build(method, path, opts)?;
        debug!("{method} {url}");

        let resp = builder.send().await.map_err(transport_error)?;
        let status = resp.status();
        trace!(%status, "response received");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body = resp.text().await.map_err(transport_error)?;
        decode_envelope(&body)
    }

    /// Issue one request and report the raw exchange.
    ///
    /// Only transport failures are returned as `Err`; any response, whatever
    /// its status or body code, comes back as a [`RawExchange`].
    pub async fn send_raw(
        &self,
        method: HttpMethod,
        path: &str,
        opts: RequestOptions,
    ) -> Result<RawExchange, Error> {
        let (builder, url) = self.build(method, path, opts)?;
        debug!("{method} {url} (raw)");

        let started = Instant::now();
        let resp = builder.send().await.map_err(transport_error)?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let text = resp.text().await.map_err(transport_error)?;
        let elapsed = started.elapsed();

        let outcome = if status.is_success() {
            decode_envelope::<Value>(&text).err()
        } else {
            Some(status_error(status, &text))
        };
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(RawExchange {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            elapsed,
            content_type,
            body,
            outcome,
        })
    }

    /// Build the request against the current auth snapshot.
    fn build(
        &self,
        method: HttpMethod,
        path: &str,
        opts: RequestOptions,
    ) -> Result<(reqwest::RequestBuilder, Url), Error> {
        let snapshot = self.auth.load_full();
        let url = join_path(&snapshot.base_url, path)?;

        let mut headers = opts.headers;
        if let Some(ref key) = snapshot.access_key {
            let mut value = HeaderValue::from_str(key.expose())
                .map_err(|_| Error::InvalidAccessKey(AccessKeyError::InvalidCharacters))?;
            value.set_sensitive(true);
            headers.insert(ACCESS_KEY_HEADER, value);
        }
        if method.carries_body() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let mut builder = self
            .http
            .request(method.as_reqwest(), url.clone())
            .headers(headers);
        if !opts.query.is_empty() {
            builder = builder.query(&opts.query);
        }
        if let Some(body) = opts.body {
            let bytes = serde_json::to_vec(&body).map_err(|e| Error::Encode(e.to_string()))?;
            builder = builder.body(bytes);
        }

        Ok((builder, url))
    }
}

// ── URL helpers ──────────────────────────────────────────────────────

/// Parse a base URL, requiring an http(s) scheme.
pub fn parse_base_url(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithoutBase));
    }
    Ok(url)
}

/// `base + path`, preserving any path prefix on the base URL.
fn join_path(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    let full = if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };
    Ok(Url::parse(&full)?)
}

// ── Classification ───────────────────────────────────────────────────

fn transport_error(err: reqwest::Error) -> Error {
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    Error::network(message)
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map_or_else(
            || format!("Request failed with status code {}", status.as_u16()),
            str::to_owned,
        );
    let data = parsed.or_else(|| (!body.is_empty()).then(|| Value::String(preview(body))));

    Error::Api {
        code: i64::from(status.as_u16()),
        message,
        data,
    }
}

fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    let envelope: ApiEnvelope<Value> = serde_json::from_str(body).map_err(|e| Error::Api {
        code: ErrorCode::INTERNAL_ERROR,
        message: format!("malformed response body: {e}"),
        data: Some(Value::String(preview(body))),
    })?;

    if envelope.code != ErrorCode::SUCCESS {
        let message = if envelope.message.is_empty() {
            format!("request failed with code {}", envelope.code)
        } else {
            envelope.message
        };
        return Err(Error::Api {
            code: envelope.code,
            message,
            data: envelope.data,
        });
    }

    let data = envelope.data.unwrap_or(Value::Null);
    serde_json::from_value(data.clone()).map_err(|e| Error::Api {
        code: ErrorCode::INTERNAL_ERROR,
        message: format!("unexpected response shape: {e}"),
        data: Some(data),
    })
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_LIMIT).collect()
}
