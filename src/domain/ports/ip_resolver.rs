//! IP Resolver Port
//!
//! The resolver abstraction the enrichment orchestrator talks to. It is
//! backed either by the in-process caching resolver or by a client of the
//! standalone resolver service.

use crate::domain::entities::GeoMetadata;
use crate::domain::ports::LookupError;
use async_trait::async_trait;

/// Failure to resolve an IP address to metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
    /// The remote resolver answered but reported its own lookup failed.
    #[error("upstream resolver reported failure")]
    Upstream,
}

#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve `ip` to geolocation metadata.
    ///
    /// `Ok` with empty metadata means the IP has no known location.
    /// `Err` means no answer could be obtained.
    async fn resolve_ip(&self, ip: &str) -> Result<GeoMetadata, ResolveError>;
}
