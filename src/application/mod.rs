//! Application Layer
//!
//! Use cases orchestrating domain ports: cache-first IP resolution and
//! batch enrichment.

mod enrichment_service;
mod geo_resolver;

pub use enrichment_service::{EnrichReport, EnrichmentService};
pub use geo_resolver::{CachingGeoResolver, Resolution, OUTCOME_HEADER};
