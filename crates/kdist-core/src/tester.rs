// ── Manual request runner ──
//
// Sends an arbitrary method + path through the authenticated client and
// hands back the raw exchange. Nothing is cached and nothing is retried.

use serde_json::Value;
use tracing::debug;

use kdist_api::{HttpMethod, RawExchange, RequestOptions};

use crate::error::CoreError;
use crate::session::Session;

/// One hand-built request.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ManualRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Add a query pair from `key=value` text.
    pub fn query_arg(mut self, raw: &str) -> Result<Self, CoreError> {
        let (key, value) = raw.split_once('=').ok_or_else(|| CoreError::ValidationFailed {
            message: format!("query parameter '{raw}' must look like key=value"),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: format!("query parameter '{raw}' has an empty key"),
            });
        }
        self.query.push((key.to_owned(), value.to_owned()));
        Ok(self)
    }

    /// Attach a JSON body from its text form. Blank text means no body.
    pub fn body_text(mut self, raw: &str) -> Result<Self, CoreError> {
        if raw.trim().is_empty() {
            self.body = None;
            return Ok(self);
        }
        let value = serde_json::from_str(raw).map_err(|e| CoreError::ValidationFailed {
            message: format!("request body is not valid JSON: {e}"),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if !self.path.starts_with('/') {
            return Err(CoreError::ValidationFailed {
                message: format!("path '{}' must start with '/'", self.path),
            });
        }
        if self.body.is_some() && !self.method.carries_body() {
            return Err(CoreError::ValidationFailed {
                message: format!("{} requests cannot carry a body", self.method),
            });
        }
        Ok(())
    }

    /// Send through the session's client. Backend failures are reported in
    /// the exchange, not as `Err`; only validation and transport errors are.
    pub async fn send(&self, session: &Session) -> Result<RawExchange, CoreError> {
        self.validate()?;
        let api = session.authenticated_api()?;

        let mut opts = RequestOptions::new();
        for (k, v) in &self.query {
            opts = opts.query_pair(k, v);
        }
        if let Some(ref body) = self.body {
            opts = opts.json_value(body.clone());
        }

        let exchange = api.send_raw(self.method, &self.path, opts).await?;
        debug!(
            status = exchange.status,
            elapsed_ms = u64::try_from(exchange.elapsed.as_millis()).unwrap_or(u64::MAX),
            "manual request finished"
        );
        Ok(exchange)
    }
}
