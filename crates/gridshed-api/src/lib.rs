//! Async client for the Enphase cloud identity service and the Envoy
//! gateway's local API.
//!
//! Two surfaces, two trust domains:
//! - [`cloud`]: enlighten.enphaseenergy.com — form login + bearer-token
//!   issuance.
//! - [`gateway`]: the Envoy on the local network — token-bootstrapped
//!   cookie session, then plain JSON endpoints.

pub mod cloud;
pub mod error;
pub mod gateway;
pub mod token;
pub mod transport;

pub use cloud::CloudAuth;
pub use error::Error;
pub use gateway::GatewayClient;
pub use token::CloudToken;
pub use transport::{TlsMode, TransportConfig};
