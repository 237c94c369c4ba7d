//! Adapters Layer
//!
//! Inbound adapters (HTTP servers) and outbound adapters (HTTP clients,
//! downstream sink) implementing the domain ports.

pub mod inbound;
pub mod outbound;
