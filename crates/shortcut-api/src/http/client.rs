//! [`HttpClient`] -- ureq-backed access to the Shortcut REST API.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use ureq::Agent;
use ureq::http::Response;

use crate::error::{ApiError, Result};
use crate::retry::{RetryPolicy, parse_retry_after};

/// Default Shortcut API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.app.shortcut.com/api/v3";

/// Timeout applied to every request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("shortcut-cookbook/", env!("CARGO_PKG_VERSION"));

/// Blocking client for the Shortcut REST API.
///
/// The token travels as the `token` query parameter on every request and is
/// never written to logs; log lines carry the request path only.
pub struct HttpClient {
    pub(crate) agent: Agent,
    pub(crate) base_url: String,
    token: String,
    pub(crate) retry: RetryPolicy,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("retry", &self.retry)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

pub(crate) enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Raw { content_type: String, bytes: Vec<u8> },
}

impl HttpClient {
    /// Creates a client for `base_url` authenticating with `token`.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the rate-limit retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path; absolute URLs pass through unchanged.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Sends one request, retrying on 429, and returns the response body.
    pub(crate) fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: &RequestBody,
    ) -> Result<String> {
        let url = self.url(path);
        let mut attempt = 0;

        loop {
            debug!("{} {}", method.as_str(), path);
            let mut response = self.dispatch(method, &url, query, body)?;
            let status = response.status().as_u16();

            if status == 429 {
                if attempt >= self.retry.max_retries {
                    return Err(ApiError::RateLimited {
                        path: path.to_string(),
                        retries: attempt,
                    });
                }
                let hint = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                let delay = self.retry.delay_for(attempt, hint);
                attempt += 1;
                warn!(
                    "rate limited on {} {}; retrying in {:.1}s ({}/{})",
                    method.as_str(),
                    path,
                    delay.as_secs_f64(),
                    attempt,
                    self.retry.max_retries
                );
                std::thread::sleep(delay);
                continue;
            }

            let text = response.body_mut().read_to_string()?;
            return check_status(method, path, status, text);
        }
    }

    fn dispatch(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: &RequestBody,
    ) -> std::result::Result<Response<ureq::Body>, ureq::Error> {
        match method {
            Method::Get | Method::Delete => {
                let mut req = if method == Method::Get {
                    self.agent.get(url)
                } else {
                    self.agent.delete(url)
                };
                req = req
                    .query("token", &self.token)
                    .header("Accept", "application/json")
                    .header("User-Agent", USER_AGENT);
                for (key, value) in query {
                    req = req.query(*key, value);
                }
                req.call()
            }
            Method::Post | Method::Put => {
                let mut req = if method == Method::Post {
                    self.agent.post(url)
                } else {
                    self.agent.put(url)
                };
                req = req
                    .query("token", &self.token)
                    .header("Accept", "application/json")
                    .header("User-Agent", USER_AGENT);
                for (key, value) in query {
                    req = req.query(*key, value);
                }
                match body {
                    RequestBody::Empty => req.send_empty(),
                    RequestBody::Json(value) => req.send_json(value),
                    RequestBody::Raw {
                        content_type,
                        bytes,
                    } => req
                        .header("Content-Type", content_type.as_str())
                        .send(bytes.as_slice()),
                }
            }
        }
    }

    // -- JSON helpers --------------------------------------------------------

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let text = self.execute(Method::Get, path, query, &RequestBody::Empty)?;
        decode(path, &text)
    }

    pub(crate) fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        let text = self.execute(Method::Post, path, &[], &RequestBody::Json(body))?;
        decode(path, &text)
    }

    pub(crate) fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        let text = self.execute(Method::Put, path, &[], &RequestBody::Json(body))?;
        decode(path, &text)
    }

    pub(crate) fn delete_path(&self, path: &str) -> Result<()> {
        self.execute(Method::Delete, path, &[], &RequestBody::Empty)?;
        Ok(())
    }
}

/// Maps non-success statuses to errors.
fn check_status(method: Method, path: &str, status: u16, text: String) -> Result<String> {
    match status {
        200..=299 => Ok(text),
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound {
            path: path.to_string(),
        }),
        _ => Err(ApiError::status(method.as_str(), path, status, &text)),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(path: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}
