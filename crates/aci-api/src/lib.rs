// aci-api: Async Rust client for the Cisco APIC REST API

pub mod client;
pub mod epg;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use client::ApicClient;
pub use epg::{EndpointGroup, EpgAddress, ObservedEpg};
pub use error::{Error, ErrorKind};
pub use session::{Credentials, Session, SessionManager};
pub use transport::{ApiRequest, RawResponse, TlsMode, Transport, TransportConfig};
