//! Geo-IP Provider Port
//!
//! Defines the interface for the external geo-IP lookup service.

use crate::domain::entities::GeoMetadata;
use async_trait::async_trait;

/// Failure of a single provider round trip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("unreadable body: {0}")]
    Body(String),
    #[error("undecodable payload: {0}")]
    Decode(String),
    /// The address cannot be sent as a single URL path segment.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
}

/// Network lookup of geolocation metadata for an IP address.
///
/// This is an outbound port. Implementations perform one round trip per
/// call and never cache; caching is the resolver's job.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Look up metadata for `ip`. Fields the provider does not report
    /// are returned empty.
    async fn lookup(&self, ip: &str) -> Result<GeoMetadata, LookupError>;
}
