//! Remote IP Resolver
//!
//! Implements IpResolver as a client of the standalone resolver service,
//! for deployments where enrichment runs as a separate pipeline stage.

use super::http_geo_provider::{body_error, parse_base_url, request_error, segment_url};
use crate::application::OUTCOME_HEADER;
use crate::domain::entities::GeoMetadata;
use crate::domain::ports::{IpResolver, LookupError, ResolveError};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

/// Client of `GET {base_url}/{ip}` on the resolver service.
///
/// `base_url` includes the route prefix, e.g.
/// `http://resolver:5501/api/v1/resolve`.
pub struct RemoteIpResolver {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteIpResolver {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }
}

#[async_trait]
impl IpResolver for RemoteIpResolver {
    async fn resolve_ip(&self, ip: &str) -> Result<GeoMetadata, ResolveError> {
        let url = segment_url(&self.base_url, ip)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            tracing::error!(ip = %ip, status = %response.status(), "can't call ip service");
            return Err(LookupError::Status(response.status().as_u16()).into());
        }

        // The service answers 200 even when its own lookup failed.
        let upstream_failed = response
            .headers()
            .get(OUTCOME_HEADER)
            .is_some_and(|v| v.as_bytes() == b"failed");

        let body = response.bytes().await.map_err(body_error)?;

        let meta: GeoMetadata =
            serde_json::from_slice(&body).map_err(|e| LookupError::Decode(e.to_string()))?;

        if upstream_failed {
            return Err(ResolveError::Upstream);
        }

        tracing::debug!(ip = %ip, response = ?meta, "ip service response");
        Ok(meta)
    }
}
