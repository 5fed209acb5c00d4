//! Convergence adapter for ACI endpoint groups.
//!
//! A reconciliation engine resolves a provider through [`Connector`] and
//! drives the returned [`EpgExternal`] with the [`ExternalClient`]
//! operations. Session handling, payload building and response
//! classification live in `aci-api`; this crate adds provider resolution,
//! session pooling, drift detection and the engine-facing error classes.

pub mod config;
pub mod connector;
pub mod error;
pub mod external;
pub mod resolver;

pub use config::{ProviderConfig, TlsVerification};
pub use connector::Connector;
pub use error::{CoreError, ErrorClass};
pub use external::{EpgExternal, ExternalClient, Observation, is_up_to_date};
pub use resolver::{ProviderResolver, ResolveError, StaticResolver, parse_credentials_secret};

pub use aci_api::{Credentials, EndpointGroup, EpgAddress, ObservedEpg};
