//! HTTP Geo-IP Provider
//!
//! Implements GeoProvider against an ip-api.com style JSON endpoint:
//! `GET {base_url}/{ip}` answering `{country, city, region, timezone, currency}`.

use crate::domain::entities::GeoMetadata;
use crate::domain::ports::{GeoProvider, LookupError};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

/// Fields requested from the provider.
const PROVIDER_FIELDS: &str = "status,country,city,region,timezone,currency";

/// Geo-IP provider reached over HTTP.
pub struct HttpGeoProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpGeoProvider {
    /// Create a provider for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }
}

/// Parse a service base URL that addresses get appended to.
pub(crate) fn parse_base_url(base_url: &str) -> anyhow::Result<Url> {
    let url = Url::parse(base_url.trim_end_matches('/'))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("base url {} cannot carry path segments", base_url);
    }
    Ok(url)
}

/// `base` with `ip` appended as exactly one percent-encoded path segment.
///
/// `/`, `?`, `#` and `%` inside `ip` are encoded, so the address can never
/// reach another path or the query. Dot segments are rejected.
pub(crate) fn segment_url(base: &Url, ip: &str) -> Result<Url, LookupError> {
    if ip == "." || ip == ".." {
        return Err(LookupError::InvalidAddress(ip.to_string()));
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| LookupError::InvalidAddress(ip.to_string()))?
        .pop_if_empty()
        .push(ip);
    Ok(url)
}

pub(crate) fn request_error(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Transport(e.to_string())
    }
}

pub(crate) fn body_error(e: reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout
    } else {
        LookupError::Body(e.to_string())
    }
}

#[async_trait]
impl GeoProvider for HttpGeoProvider {
    async fn lookup(&self, ip: &str) -> Result<GeoMetadata, LookupError> {
        let url = segment_url(&self.base_url, ip)?;

        let response = self
            .client
            .get(url)
            .query(&[("fields", PROVIDER_FIELDS)])
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await.map_err(body_error)?;

        serde_json::from_slice(&body).map_err(|e| LookupError::Decode(e.to_string()))
    }
}
