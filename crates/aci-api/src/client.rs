// APIC REST client
//
// Pairs a shared `SessionManager` with response classification: status
// codes, inline faults, and envelope decoding. Managed-object endpoints
// (endpoint groups, etc.) are inherent methods in their own modules.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::Error;
use crate::models::{Envelope, parse_fault};
use crate::session::SessionManager;
use crate::transport::{ApiRequest, RawResponse};

/// Client for the `/api/node/mo/...` surface of one controller.
///
/// Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct ApicClient {
    session: Arc<SessionManager>,
}

impl ApicClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// The session manager backing this client.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// GET a managed-object path and decode the envelope.
    pub(crate) async fn get(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Envelope, Error> {
        let request = ApiRequest::get(path);
        let resp = self.session.with_session(&request, cancel).await?;
        classify(path, &resp)
    }

    /// POST a JSON payload to a managed-object path and decode the envelope.
    pub(crate) async fn post(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
        cancel: &CancellationToken,
    ) -> Result<Envelope, Error> {
        let request = ApiRequest::post(path, body)?;
        let resp = self.session.with_session(&request, cancel).await?;
        classify(path, &resp)
    }
}

/// Map a raw response onto the error taxonomy.
///
/// - 404 is [`Error::NotFound`]
/// - other non-success statuses are [`Error::ApiFault`] when the body
///   carries a fault, [`Error::Status`] otherwise
/// - success bodies are decoded, and an inline fault still fails the call
pub fn classify(path: &str, resp: &RawResponse) -> Result<Envelope, Error> {
    trace!(status = %resp.status, body = %resp.body, "classifying response");

    if resp.status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound { path: path.into() });
    }

    if !resp.status.is_success() {
        return Err(parse_fault(&resp.body).unwrap_or_else(|| Error::Status {
            status: resp.status.as_u16(),
            body: resp.body.chars().take(200).collect(),
        }));
    }

    let envelope = Envelope::parse(&resp.body)?;
    if let Some(fault) = envelope.fault() {
        return Err(Error::from(fault));
    }
    Ok(envelope)
}
