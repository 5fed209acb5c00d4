// ── Convergence adapter ──
//
// The operations the reconciliation engine drives: observe, create, update,
// delete. Each one is a single remote call (plus at most one session
// renewal inside `aci-api`). Nothing here retries or schedules.

use std::future::Future;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use aci_api::epg::{create_payload, delete_payload, update_payload};
use aci_api::{ApicClient, EndpointGroup, ObservedEpg};

use crate::error::CoreError;

/// What the engine needs to know after an observe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
}

impl Observation {
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Fixed operation set the engine calls for one declared resource.
pub trait ExternalClient: Send + Sync {
    fn observe(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Observation, CoreError>> + Send;

    fn create(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn update(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn delete(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Drift check. A missing remote attribute compares as the empty string.
pub fn is_up_to_date(desired: &EndpointGroup, observed: &ObservedEpg) -> bool {
    observed.description().unwrap_or_default() == desired.description
        && observed.bridge_domain().unwrap_or_default() == desired.bridge_domain
}

/// `ExternalClient` for application EPGs, bound to one authenticated client.
#[derive(Clone)]
pub struct EpgExternal {
    client: ApicClient,
}

impl EpgExternal {
    pub fn new(client: ApicClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApicClient {
        &self.client
    }

    /// Observe and also return the raw remote attributes.
    pub async fn observe_detailed(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> Result<(Observation, ObservedEpg), CoreError> {
        let address = desired.address();
        let observed = self.client.get_epg(&address, cancel).await?;

        if !observed.exists {
            debug!(dn = %address, "EPG absent");
            return Ok((Observation::absent(), observed));
        }

        let up_to_date = is_up_to_date(desired, &observed);
        debug!(dn = %address, up_to_date, "EPG observed");
        Ok((
            Observation {
                resource_exists: true,
                resource_up_to_date: up_to_date,
            },
            observed,
        ))
    }
}

impl ExternalClient for EpgExternal {
    async fn observe(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> Result<Observation, CoreError> {
        let (observation, _) = self.observe_detailed(desired, cancel).await?;
        Ok(observation)
    }

    async fn create(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let address = desired.address();
        self.client
            .post_epg(&address, &create_payload(desired), cancel)
            .await?;
        info!(dn = %address, bd = %desired.bridge_domain, "EPG created");
        Ok(())
    }

    async fn update(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let address = desired.address();
        self.client
            .post_epg(&address, &update_payload(desired), cancel)
            .await?;
        info!(dn = %address, bd = %desired.bridge_domain, "EPG updated");
        Ok(())
    }

    async fn delete(
        &self,
        desired: &EndpointGroup,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let address = desired.address();
        match self
            .client
            .post_epg(&address, &delete_payload(), cancel)
            .await
        {
            Ok(()) => {
                info!(dn = %address, "EPG deleted");
                Ok(())
            }
            Err(aci_api::Error::NotFound { .. }) => {
                debug!(dn = %address, "EPG already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
