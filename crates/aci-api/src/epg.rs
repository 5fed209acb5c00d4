// Endpoint groups (`fvAEPg`)
//
// Address derivation, declarative-merge payloads, and observation parsing
// for application EPGs under `uni/tn-{tenant}/ap-{app}/epg-{name}`.
// Create and update are both POSTs to the object's own address; delete is
// a POST that flips `status` to `deleted`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::ApicClient;
use crate::error::Error;
use crate::models::{Attributes, Envelope};

/// Managed-object class of an application EPG.
pub const EPG_CLASS: &str = "fvAEPg";
/// QoS class assigned to newly created EPGs.
pub const DEFAULT_PRIORITY: &str = "level3";
/// Attribute carrying the bridge-domain name on the `fvRsBd` relation.
pub const BRIDGE_DOMAIN_ATTR: &str = "tnFvBDName";
/// Attribute carrying the EPG description.
pub const DESCRIPTION_ATTR: &str = "descr";

// ── Identity ────────────────────────────────────────────────────────

/// External identity of an EPG: `(tenant, application profile, name)`.
///
/// Two desired records with the same address denote the same remote object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpgAddress {
    pub tenant: String,
    pub app_profile: String,
    pub name: String,
}

impl EpgAddress {
    pub fn new(
        tenant: impl Into<String>,
        app_profile: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            app_profile: app_profile.into(),
            name: name.into(),
        }
    }

    /// Distinguished name, e.g. `uni/tn-t1/ap-ap1/epg-e1`.
    pub fn dn(&self) -> String {
        format!(
            "uni/tn-{}/ap-{}/epg-{}",
            self.tenant, self.app_profile, self.name
        )
    }

    /// Relative name, e.g. `epg-e1`.
    pub fn rn(&self) -> String {
        format!("epg-{}", self.name)
    }

    /// REST path of the object, e.g. `/api/node/mo/uni/tn-t1/ap-ap1/epg-e1.json`.
    pub fn path(&self) -> String {
        format!("/api/node/mo/{}.json", self.dn())
    }
}

impl fmt::Display for EpgAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dn())
    }
}

// ── Desired state ───────────────────────────────────────────────────

/// Declared target state of an EPG.
///
/// Field names on the wire follow the declared resource's `forProvider`
/// block (`appProfile`, `bd`, `desc`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointGroup {
    pub tenant: String,
    #[serde(rename = "appProfile")]
    pub app_profile: String,
    pub name: String,
    #[serde(rename = "bd", default)]
    pub bridge_domain: String,
    #[serde(rename = "desc", default)]
    pub description: String,
}

impl EndpointGroup {
    pub fn address(&self) -> EpgAddress {
        EpgAddress::new(&self.tenant, &self.app_profile, &self.name)
    }
}

// ── Payloads ────────────────────────────────────────────────────────

/// Per-object status marker of a declarative-merge payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoStatus {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "created,modified")]
    CreatedModified,
    #[serde(rename = "deleted")]
    Deleted,
}

/// `{"fvAEPg": {...}}` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpgPayload {
    #[serde(rename = "fvAEPg")]
    pub epg: PayloadObject<EpgAttributes>,
}

/// `{ attributes, children }` of an outgoing managed object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayloadObject<A> {
    pub attributes: A,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EpgChild>,
}

/// EPG attributes. Only fields that are `Some` are sent, and the remote
/// side leaves everything else untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpgAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MoStatus>,
}

/// Child relations an EPG payload can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EpgChild {
    /// Binding to a bridge domain.
    #[serde(rename = "fvRsBd")]
    BridgeDomain(PayloadObject<BridgeDomainAttributes>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDomainAttributes {
    #[serde(rename = "tnFvBDName")]
    pub tn_fv_bd_name: String,
    pub status: MoStatus,
}

fn bridge_domain_child(bridge_domain: &str) -> EpgChild {
    EpgChild::BridgeDomain(PayloadObject {
        attributes: BridgeDomainAttributes {
            tn_fv_bd_name: bridge_domain.to_owned(),
            status: MoStatus::CreatedModified,
        },
        children: Vec::new(),
    })
}

/// Full payload for creating the EPG. Marked `created,modified` so that
/// replaying it against an existing object merges instead of failing.
pub fn create_payload(desired: &EndpointGroup) -> EpgPayload {
    let address = desired.address();
    EpgPayload {
        epg: PayloadObject {
            attributes: EpgAttributes {
                dn: Some(address.dn()),
                name: Some(desired.name.clone()),
                descr: Some(desired.description.clone()),
                prio: Some(DEFAULT_PRIORITY.into()),
                rn: Some(address.rn()),
                status: Some(MoStatus::CreatedModified),
            },
            children: vec![bridge_domain_child(&desired.bridge_domain)],
        },
    }
}

/// Payload touching only the mutable fields. Identity attributes
/// (`dn`, `rn`, `name`) are carried by the URL and not resent.
pub fn update_payload(desired: &EndpointGroup) -> EpgPayload {
    EpgPayload {
        epg: PayloadObject {
            attributes: EpgAttributes {
                descr: Some(desired.description.clone()),
                status: Some(MoStatus::Modified),
                ..EpgAttributes::default()
            },
            children: vec![bridge_domain_child(&desired.bridge_domain)],
        },
    }
}

/// Minimal payload removing the EPG at the request address.
pub fn delete_payload() -> EpgPayload {
    EpgPayload {
        epg: PayloadObject {
            attributes: EpgAttributes {
                status: Some(MoStatus::Deleted),
                ..EpgAttributes::default()
            },
            children: Vec::new(),
        },
    }
}

// ── Observation ─────────────────────────────────────────────────────

/// Remote state of an EPG, read fresh on every observe.
///
/// `attributes` holds the `fvAEPg` attributes plus `tnFvBDName` lifted
/// from the `fvRsBd` child.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObservedEpg {
    pub exists: bool,
    pub attributes: Attributes,
}

impl ObservedEpg {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn description(&self) -> Option<&str> {
        self.attributes.get(DESCRIPTION_ATTR).map(String::as_str)
    }

    pub fn bridge_domain(&self) -> Option<&str> {
        self.attributes.get(BRIDGE_DOMAIN_ATTR).map(String::as_str)
    }
}

/// Interpret a successful observe envelope.
///
/// No matching objects is a normal outcome (`exists = false`). A first
/// element that is neither a fault nor an `fvAEPg` is a decoding error.
pub fn parse_observation(envelope: &Envelope) -> Result<ObservedEpg, Error> {
    if envelope.is_empty() {
        return Ok(ObservedEpg::absent());
    }

    let Some(epg) = envelope.imdata.first().and_then(|item| item.fv_aepg.as_ref()) else {
        return Err(Error::Deserialization {
            message: format!("observe response carried no {EPG_CLASS} object"),
            body: envelope.raw.clone(),
        });
    };

    let mut attributes = epg.attributes.clone();
    if let Some(bd) = epg
        .children
        .iter()
        .find_map(|child| child.fv_rs_bd.as_ref())
        .and_then(|rs| rs.attributes.get(BRIDGE_DOMAIN_ATTR))
    {
        attributes.insert(BRIDGE_DOMAIN_ATTR.into(), bd.clone());
    }

    Ok(ObservedEpg {
        exists: true,
        attributes,
    })
}

// ── Endpoint methods ────────────────────────────────────────────────

impl ApicClient {
    /// Read an EPG and its bridge-domain relation. Absence is not an error.
    pub async fn get_epg(
        &self,
        address: &EpgAddress,
        cancel: &CancellationToken,
    ) -> Result<ObservedEpg, Error> {
        let path = format!(
            "{}?rsp-subtree=children&rsp-subtree-class=fvRsBd",
            address.path()
        );
        match self.get(&path, cancel).await {
            Ok(envelope) => parse_observation(&envelope),
            Err(Error::NotFound { .. }) => {
                debug!(dn = %address, "EPG not found (HTTP 404)");
                Ok(ObservedEpg::absent())
            }
            Err(e) => Err(e),
        }
    }

    /// POST an EPG payload to the object's address.
    pub async fn post_epg(
        &self,
        address: &EpgAddress,
        payload: &EpgPayload,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        self.post(&address.path(), payload, cancel).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn record() -> EndpointGroup {
        EndpointGroup {
            tenant: "t1".into(),
            app_profile: "ap1".into(),
            name: "e1".into(),
            bridge_domain: "bd1".into(),
            description: "d1".into(),
        }
    }

    #[test]
    fn address_derivation() {
        let addr = record().address();
        assert_eq!(addr.dn(), "uni/tn-t1/ap-ap1/epg-e1");
        assert_eq!(addr.rn(), "epg-e1");
        assert_eq!(addr.path(), "/api/node/mo/uni/tn-t1/ap-ap1/epg-e1.json");
    }

    #[test]
    fn identity_ignores_mutable_fields() {
        let mut other = record();
        other.description = "changed".into();
        other.bridge_domain = "bd2".into();
        assert_eq!(record().address(), other.address());
    }

    #[test]
    fn create_payload_shape() {
        let value = serde_json::to_value(create_payload(&record())).unwrap();
        assert_eq!(
            value,
            json!({
                "fvAEPg": {
                    "attributes": {
                        "dn": "uni/tn-t1/ap-ap1/epg-e1",
                        "name": "e1",
                        "descr": "d1",
                        "prio": "level3",
                        "rn": "epg-e1",
                        "status": "created,modified"
                    },
                    "children": [{
                        "fvRsBd": {
                            "attributes": {
                                "tnFvBDName": "bd1",
                                "status": "created,modified"
                            }
                        }
                    }]
                }
            })
        );
    }

    #[test]
    fn update_payload_omits_identity() {
        let value = serde_json::to_value(update_payload(&record())).unwrap();
        let attrs = &value["fvAEPg"]["attributes"];
        assert_eq!(attrs, &json!({ "descr": "d1", "status": "modified" }));
        assert_eq!(
            value["fvAEPg"]["children"][0]["fvRsBd"]["attributes"]["tnFvBDName"],
            "bd1"
        );
    }

    #[test]
    fn delete_payload_is_minimal() {
        let value = serde_json::to_value(delete_payload()).unwrap();
        assert_eq!(value, json!({ "fvAEPg": { "attributes": { "status": "deleted" } } }));
    }

    #[test]
    fn observation_lifts_bridge_domain() {
        let envelope = Envelope::parse(
            &json!({
                "totalCount": "1",
                "imdata": [{
                    "fvAEPg": {
                        "attributes": { "dn": "uni/tn-t1/ap-ap1/epg-e1", "name": "e1", "descr": "d1" },
                        "children": [{ "fvRsBd": { "attributes": { "tnFvBDName": "bd1" } } }]
                    }
                }]
            })
            .to_string(),
        )
        .unwrap();
        let observed = parse_observation(&envelope).unwrap();
        assert!(observed.exists);
        assert_eq!(observed.description(), Some("d1"));
        assert_eq!(observed.bridge_domain(), Some("bd1"));
    }

    #[test]
    fn empty_observation_is_absent() {
        let envelope = Envelope::parse(r#"{"totalCount":"0","imdata":[]}"#).unwrap();
        assert_eq!(parse_observation(&envelope).unwrap(), ObservedEpg::absent());
    }

    #[test]
    fn foreign_class_is_a_decoding_error() {
        let raw = r#"{"totalCount":"1","imdata":[{"fvBD":{"attributes":{}}}]}"#;
        let envelope = Envelope::parse(raw).unwrap();
        match parse_observation(&envelope) {
            Err(Error::Deserialization { body, .. }) => assert_eq!(body, raw),
            other => panic!("expected Deserialization, got {other:?}"),
        }
    }

    #[test]
    fn desired_record_uses_resource_field_names() {
        let parsed: EndpointGroup = serde_json::from_value(json!({
            "tenant": "t1", "appProfile": "ap1", "name": "e1", "bd": "bd1", "desc": "d1"
        }))
        .unwrap();
        assert_eq!(parsed, record());
    }
}
