// APIC session lifecycle
//
// Token-based login against `/api/aaaLogin.json`, lazy session creation,
// and one-shot renewal when the controller answers HTTP 403. The token is
// sent as the `APIC-cookie` cookie on every authenticated call.
//
// Session states:
//
//   Unauthenticated ──login──▶ Authenticated ──403──▶ Reauthenticating
//          ▲                        ▲                        │
//          └──────── rejected ──────┼──────── renewed ◀──────┘
//
// A failed login drops the cached session, so the next call starts again
// from Unauthenticated. Concurrent callers share one login per epoch.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{Envelope, parse_fault};
use crate::transport::{ApiRequest, RawResponse, Transport};

const LOGIN_PATH: &str = "/api/aaaLogin.json";
const LOGOUT_PATH: &str = "/api/aaaLogout.json";

/// Username/password pair for the controller.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Same username and password.
    pub fn same_as(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password.expose_secret() == other.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// An authenticated APIC session.
pub struct Session {
    token: SecretString,
    acquired_at: DateTime<Utc>,
    generation: u64,
}

impl Session {
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Login epoch that produced this session. Strictly increasing per manager.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("acquired_at", &self.acquired_at)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// Result of the most recent definitive login attempt.
#[derive(Clone)]
enum LoginOutcome {
    Established(Arc<Session>),
    Rejected(String),
}

impl LoginOutcome {
    fn to_result(&self) -> Result<Arc<Session>, Error> {
        match self {
            Self::Established(session) => Ok(Arc::clone(session)),
            Self::Rejected(message) => Err(Error::AuthExpired {
                message: message.clone(),
            }),
        }
    }
}

struct LoginSlot {
    epoch: u64,
    last: Option<LoginOutcome>,
}

/// Per-call position in the bounded retry: a 403 while `Authenticated`
/// renews once, a 403 while `Reauthenticated` is terminal.
enum CallState {
    Authenticated(Arc<Session>),
    Reauthenticated(Arc<Session>),
}

/// Owns the session for one controller/credential pair.
///
/// Share it behind an `Arc`; every clone of a client built on it reuses the
/// same token. Reads of the current session never block. Logins are
/// serialized and coalesced: callers that queued behind a login reuse its
/// outcome instead of issuing their own.
pub struct SessionManager {
    transport: Transport,
    credentials: Credentials,
    current: ArcSwapOption<Session>,
    epoch: AtomicU64,
    login_slot: Mutex<LoginSlot>,
}

impl SessionManager {
    pub fn new(transport: Transport, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            current: ArcSwapOption::from(None),
            epoch: AtomicU64::new(0),
            login_slot: Mutex::new(LoginSlot {
                epoch: 0,
                last: None,
            }),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The cached session, if one is established.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    /// Return the cached session, logging in first if there is none.
    pub async fn ensure_authenticated(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<Session>, Error> {
        // Read the epoch before the session: a login that lands in between
        // bumps the epoch and is picked up by `login_coalesced`.
        let seen = self.epoch.load(Ordering::Acquire);
        if let Some(session) = self.current.load_full() {
            return Ok(session);
        }
        self.login_coalesced(seen, cancel).await
    }

    /// Replace `stale` with a fresh session. If another caller already
    /// logged in after `stale` was issued, its outcome is reused.
    pub async fn renew(
        &self,
        stale: &Session,
        cancel: &CancellationToken,
    ) -> Result<Arc<Session>, Error> {
        self.login_coalesced(stale.generation, cancel).await
    }

    /// Execute `request` with the session cookie attached.
    ///
    /// An HTTP 403 triggers exactly one renewal and one retry. A second 403
    /// surfaces as [`Error::AuthExpired`]. Any other response is returned
    /// unclassified.
    pub async fn with_session(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, Error> {
        let mut state = CallState::Authenticated(self.ensure_authenticated(cancel).await?);

        loop {
            let session = match &state {
                CallState::Authenticated(s) | CallState::Reauthenticated(s) => Arc::clone(s),
            };
            let resp = self
                .transport
                .execute(request, Some(&session), cancel)
                .await?;
            if resp.status != StatusCode::FORBIDDEN {
                return Ok(resp);
            }

            state = match state {
                CallState::Authenticated(stale) => {
                    warn!(
                        path = request.path(),
                        generation = stale.generation,
                        "session rejected (HTTP 403), renewing"
                    );
                    CallState::Reauthenticated(self.renew(&stale, cancel).await?)
                }
                CallState::Reauthenticated(_) => {
                    return Err(Error::AuthExpired {
                        message: format!(
                            "{} {} rejected with HTTP 403 after session renewal",
                            request.method(),
                            request.path()
                        ),
                    });
                }
            };
        }
    }

    /// End the current session on the controller and drop it locally.
    pub async fn logout(&self, cancel: &CancellationToken) -> Result<(), Error> {
        let Some(session) = self.current.swap(None) else {
            return Ok(());
        };

        let body = json!({
            "aaaUser": { "attributes": { "name": self.credentials.username } }
        });
        let request = ApiRequest::post(LOGOUT_PATH, &body)?;
        let resp = self
            .transport
            .execute(&request, Some(&session), cancel)
            .await?;
        debug!(status = %resp.status, "logout complete");
        Ok(())
    }

    // ── Login ────────────────────────────────────────────────────────

    async fn login_coalesced(
        &self,
        seen: u64,
        cancel: &CancellationToken,
    ) -> Result<Arc<Session>, Error> {
        let mut slot = self.login_slot.lock().await;

        if slot.epoch > seen {
            if let Some(outcome) = &slot.last {
                debug!(epoch = slot.epoch, "reusing concurrent login outcome");
                return outcome.to_result();
            }
        }

        let epoch = slot.epoch + 1;
        let outcome = match self.login(epoch, cancel).await {
            Ok(session) => {
                let session = Arc::new(session);
                self.current.store(Some(Arc::clone(&session)));
                LoginOutcome::Established(session)
            }
            Err(Error::AuthExpired { message }) => {
                self.current.store(None);
                LoginOutcome::Rejected(message)
            }
            // Transport trouble is not a verdict on the credentials; the
            // next caller tries again.
            Err(other) => return Err(other),
        };

        slot.epoch = epoch;
        slot.last = Some(outcome.clone());
        self.epoch.store(epoch, Ordering::Release);
        outcome.to_result()
    }

    /// The login exchange. Goes straight to the transport, never through
    /// [`with_session`](Self::with_session).
    async fn login(&self, epoch: u64, cancel: &CancellationToken) -> Result<Session, Error> {
        debug!(
            "logging in at {} as {}",
            self.transport.base_url(),
            self.credentials.username
        );

        let body = json!({
            "aaaUser": {
                "attributes": {
                    "name": self.credentials.username,
                    "pwd": self.credentials.password.expose_secret(),
                }
            }
        });
        let request = ApiRequest::post(LOGIN_PATH, &body)?;
        let resp = self.transport.execute(&request, None, cancel).await?;

        if !resp.status.is_success() {
            let reason = match parse_fault(&resp.body) {
                Some(Error::ApiFault { code, text }) => format!("fault {code}: {text}"),
                _ => resp.body.chars().take(200).collect(),
            };
            return Err(Error::AuthExpired {
                message: format!("login failed (HTTP {}): {reason}", resp.status),
            });
        }

        let envelope = Envelope::parse(&resp.body).map_err(|e| Error::AuthExpired {
            message: format!("unreadable login response: {e}"),
        })?;
        if let Some(fault) = envelope.fault() {
            return Err(Error::AuthExpired {
                message: format!("login failed: fault {}: {}", fault.code, fault.text),
            });
        }
        let token = envelope.login_token().ok_or_else(|| Error::AuthExpired {
            message: "login response carried no token".into(),
        })?;

        let session = Session {
            token: SecretString::from(token.to_owned()),
            acquired_at: Utc::now(),
            generation: epoch,
        };
        // Reject tokens that could never be sent back.
        crate::transport::cookie_header(&session)?;

        info!(
            username = %self.credentials.username,
            generation = epoch,
            refresh_timeout = ?envelope
                .imdata
                .first()
                .and_then(|item| item.aaa_login.as_ref())
                .and_then(|mo| mo.attributes.refresh_timeout_seconds.as_deref()),
            "session established"
        );
        Ok(session)
    }
}
