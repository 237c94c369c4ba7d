//! geo-enrich Library
//!
//! Enriches log records with geolocation metadata resolved from their IP
//! address, through a time-bounded cache in front of a geo-IP provider.
//! This module exposes the components for integration tests and for use
//! as a library.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{CachingGeoResolver, EnrichReport, EnrichmentService, Resolution};
pub use config::{load_config, Config};
pub use domain::entities::{GeoMetadata, LogBatch, LogRecord};
pub use domain::ports::{GeoProvider, IpResolver, LogSink, LookupError, ResolveError};
pub use infrastructure::{CancelToken, ExpiringCache, ShutdownController, SweepHandle};
