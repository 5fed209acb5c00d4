// Typed model of the APIC `imdata` envelope.
//
// Every APIC response is `{ "totalCount": "N", "imdata": [ { <class>: { attributes, children } } ] }`.
// Only the classes this crate consumes are modelled; unknown classes
// deserialize to an `ImItem` with every field `None`.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Error;

/// Attribute map of a managed object. APIC encodes every attribute as a string.
pub type Attributes = BTreeMap<String, String>;

/// The `{ totalCount, imdata }` envelope.
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(rename = "totalCount", default)]
    pub total_count: Option<String>,
    #[serde(default)]
    pub imdata: Vec<ImItem>,
    /// Body the envelope was decoded from, kept for diagnostics.
    #[serde(skip)]
    pub raw: String,
}

/// One element of `imdata`, keyed by managed-object class.
#[derive(Debug, Default, Deserialize)]
pub struct ImItem {
    pub error: Option<ManagedObject<FaultAttributes>>,
    #[serde(rename = "aaaLogin")]
    pub aaa_login: Option<ManagedObject<LoginAttributes>>,
    #[serde(rename = "fvAEPg")]
    pub fv_aepg: Option<ManagedObject<Attributes>>,
}

/// `{ attributes, children }` body shared by every managed object.
#[derive(Debug, Deserialize)]
pub struct ManagedObject<A> {
    pub attributes: A,
    #[serde(default)]
    pub children: Vec<ChildItem>,
}

/// Child relation of a managed object.
#[derive(Debug, Default, Deserialize)]
pub struct ChildItem {
    #[serde(rename = "fvRsBd")]
    pub fv_rs_bd: Option<ManagedObject<Attributes>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FaultAttributes {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginAttributes {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "refreshTimeoutSeconds", default)]
    pub refresh_timeout_seconds: Option<String>,
}

impl Envelope {
    /// Decode a response body. An empty body is an empty envelope.
    pub fn parse(body: &str) -> Result<Self, Error> {
        if body.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut envelope: Self = serde_json::from_str(body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.to_owned(),
            }
        })?;
        envelope.raw = body.to_owned();
        Ok(envelope)
    }

    /// The fault carried by the first `imdata` element, if any.
    pub fn fault(&self) -> Option<&FaultAttributes> {
        self.imdata
            .first()
            .and_then(|item| item.error.as_ref())
            .map(|mo| &mo.attributes)
    }

    /// `true` when the envelope says no objects matched.
    pub fn is_empty(&self) -> bool {
        self.imdata.is_empty() || self.total_count.as_deref() == Some("0")
    }

    /// The `aaaLogin` token of the first element, if present and non-empty.
    pub fn login_token(&self) -> Option<&str> {
        self.imdata
            .first()
            .and_then(|item| item.aaa_login.as_ref())
            .and_then(|mo| mo.attributes.token.as_deref())
            .filter(|token| !token.is_empty())
    }
}

impl From<&FaultAttributes> for Error {
    fn from(fault: &FaultAttributes) -> Self {
        Error::ApiFault {
            code: fault.code.clone(),
            text: fault.text.clone(),
        }
    }
}

/// Inspect a raw body for an inline fault, independent of the HTTP status.
pub fn parse_fault(body: &str) -> Option<Error> {
    let envelope = Envelope::parse(body).ok()?;
    envelope.fault().map(Error::from)
}
