// Single-call HTTP transport for the APIC REST API.
//
// Owns the `reqwest::Client`, TLS settings, and URL construction. Knows
// nothing about sessions or managed objects: the caller hands in a request
// and, optionally, the session whose token goes into the `APIC-cookie`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, COOKIE, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::session::Session;

/// Name of the session cookie APIC expects on authenticated calls.
pub const SESSION_COOKIE: &str = "APIC-cookie";

/// TLS verification mode.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate. Only ever set by explicit opt-in.
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("aci-sync/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

// ── Request / response ──────────────────────────────────────────────

/// One HTTP call against the controller: method, API path, optional JSON body.
///
/// Cheap to clone, so the session layer can replay it after a renewal.
#[derive(Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Bytes>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: &impl Serialize) -> Result<Self, Error> {
        Ok(Self {
            method: Method::POST,
            path: path.into(),
            body: Some(Bytes::from(serde_json::to_vec(body)?)),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

// Bodies can carry the login password.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .finish()
    }
}

/// Status and body of a completed call. Classification happens upstream.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

// ── Transport ───────────────────────────────────────────────────────

/// Executes single HTTP calls against one controller.
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl Transport {
    /// Create a transport for `base_url` (e.g. `https://apic.example.net`).
    pub fn new(base_url: Url, config: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: config.build_client()?,
            base_url,
            timeout: config.timeout,
        })
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: TransportConfig::default().timeout,
        }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL for an API path such as `/api/aaaLogin.json`.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Execute one call. The session token, when given, is sent as the
    /// `APIC-cookie` cookie. Cancelling `cancel` aborts the call and yields
    /// [`Error::Cancelled`].
    pub async fn execute(
        &self,
        request: &ApiRequest,
        session: Option<&Session>,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        let url = self.url(&request.path)?;
        debug!("{} {}", request.method, url);

        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }
        if let Some(session) = session {
            builder = builder.header(COOKIE, cookie_header(session)?);
        }

        let call = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>(RawResponse { status, body })
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(path = %request.path, "request cancelled");
                Err(Error::Cancelled)
            }
            result = call => result.map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout { timeout_secs: whole_seconds(self.timeout) }
                } else {
                    Error::Transport(e)
                }
            }),
        }
    }
}

/// Seconds for error reporting, rounded up so sub-second timeouts never read as 0.
fn whole_seconds(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}

/// `APIC-cookie=<token>`, marked sensitive so it never shows up in logs.
pub(crate) fn cookie_header(session: &Session) -> Result<HeaderValue, Error> {
    let mut value =
        HeaderValue::from_str(&format!("{SESSION_COOKIE}={}", session.token().expose_secret()))
            .map_err(|e| Error::AuthExpired {
                message: format!("session token is not a valid header value: {e}"),
            })?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn transport(base: &str) -> Transport {
        Transport::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn joins_paths_without_double_slashes() {
        let t = transport("https://apic.example.net/");
        let url = t.url("/api/aaaLogin.json").unwrap();
        assert_eq!(url.as_str(), "https://apic.example.net/api/aaaLogin.json");
    }

    #[test]
    fn keeps_query_strings() {
        let t = transport("https://apic.example.net");
        let url = t
            .url("/api/node/mo/uni/tn-a.json?rsp-subtree=children")
            .unwrap();
        assert_eq!(url.path(), "/api/node/mo/uni/tn-a.json");
        assert_eq!(url.query(), Some("rsp-subtree=children"));
    }

    #[test]
    fn debug_hides_request_body() {
        let req = ApiRequest::post("/api/aaaLogin.json", &serde_json::json!({"pwd": "hunter2"}))
            .unwrap();
        let rendered = format!("{req:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("aaaLogin"));
    }

    #[test]
    fn timeout_seconds_round_up() {
        assert_eq!(whole_seconds(Duration::from_millis(100)), 1);
        assert_eq!(whole_seconds(Duration::from_secs(30)), 30);
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
    }

    #[test]
    fn default_tls_verifies_certificates() {
        assert!(matches!(TransportConfig::default().tls, TlsMode::System));
    }
}
