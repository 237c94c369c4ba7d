mod http_geo_provider;
mod remote_ip_resolver;
mod tracing_log_sink;

pub use http_geo_provider::HttpGeoProvider;
pub use remote_ip_resolver::RemoteIpResolver;
pub use tracing_log_sink::TracingLogSink;
