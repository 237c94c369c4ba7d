mod geo_provider;
mod ip_resolver;
mod log_sink;

pub use geo_provider::{GeoProvider, LookupError};
pub use ip_resolver::{IpResolver, ResolveError};
pub use log_sink::{LogSink, SinkError};
