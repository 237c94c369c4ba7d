//! Caching Geo Resolver - cache-first IP resolution use case
//!
//! Checks the shared expiring cache before asking the geo-IP provider, and
//! populates the cache with every successful lookup.

use crate::domain::entities::GeoMetadata;
use crate::domain::ports::{GeoProvider, IpResolver, LookupError, ResolveError};
use crate::infrastructure::ExpiringCache;
use async_trait::async_trait;
use std::sync::Arc;

/// Response header carrying the resolution outcome of the resolver service.
pub const OUTCOME_HEADER: &str = "x-resolve-outcome";

/// How a resolution was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served from the cache without a network call.
    Cached(GeoMetadata),
    /// Fetched from the provider and cached.
    Fetched(GeoMetadata),
    /// The provider lookup failed; nothing was cached.
    Failed(LookupError),
}

impl Resolution {
    /// Metadata as seen by callers that do not care about the outcome.
    /// A failed lookup yields empty metadata.
    pub fn into_metadata(self) -> GeoMetadata {
        match self {
            Resolution::Cached(meta) | Resolution::Fetched(meta) => meta,
            Resolution::Failed(_) => GeoMetadata::default(),
        }
    }

    /// Wire label used in [`OUTCOME_HEADER`].
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Cached(_) => "cached",
            Resolution::Fetched(_) => "fetched",
            Resolution::Failed(_) => "failed",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Resolution::Failed(_))
    }
}

/// Cache-first resolver in front of a [`GeoProvider`].
///
/// The cache is shared: every resolver built from the same
/// `Arc<ExpiringCache>` sees the others' entries.
pub struct CachingGeoResolver {
    cache: Arc<ExpiringCache<GeoMetadata>>,
    provider: Arc<dyn GeoProvider>,
}

impl CachingGeoResolver {
    pub fn new(cache: Arc<ExpiringCache<GeoMetadata>>, provider: Arc<dyn GeoProvider>) -> Self {
        Self { cache, provider }
    }

    pub fn cache(&self) -> &Arc<ExpiringCache<GeoMetadata>> {
        &self.cache
    }

    /// Resolve `ip`, never failing. Lookup failures yield empty metadata.
    pub async fn resolve(&self, ip: &str) -> GeoMetadata {
        self.resolve_detailed(ip).await.into_metadata()
    }

    /// Resolve `ip` and report whether the answer came from the cache, the
    /// provider, or not at all.
    ///
    /// Provider results are cached even when some or all fields are empty.
    /// Failures are not cached, so the next call retries the provider.
    pub async fn resolve_detailed(&self, ip: &str) -> Resolution {
        if let Some(meta) = self.cache.get(ip) {
            tracing::debug!(ip = %ip, "geo cache hit");
            return Resolution::Cached(meta);
        }

        match self.provider.lookup(ip).await {
            Ok(meta) => {
                self.cache.set(ip, meta.clone());
                tracing::debug!(ip = %ip, country = %meta.country, "geo metadata fetched");
                Resolution::Fetched(meta)
            }
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "geo lookup failed");
                Resolution::Failed(e)
            }
        }
    }
}

#[async_trait]
impl IpResolver for CachingGeoResolver {
    async fn resolve_ip(&self, ip: &str) -> Result<GeoMetadata, ResolveError> {
        match self.resolve_detailed(ip).await {
            Resolution::Cached(meta) | Resolution::Fetched(meta) => Ok(meta),
            Resolution::Failed(e) => Err(ResolveError::Lookup(e)),
        }
    }
}
