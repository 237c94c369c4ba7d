//! geo-enrich - IP geolocation enrichment for log records
//!
//! This is the composition root that wires together all the components.

use geo_enrich::adapters::inbound::{EventReceiver, ResolveServer};
use geo_enrich::adapters::outbound::{HttpGeoProvider, RemoteIpResolver, TracingLogSink};
use geo_enrich::application::{CachingGeoResolver, EnrichmentService};
use geo_enrich::config::load_config;
use geo_enrich::domain::entities::GeoMetadata;
use geo_enrich::domain::ports::IpResolver;
use geo_enrich::infrastructure::{shutdown_signal, ExpiringCache, ShutdownController};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    cfg.validate()?;

    tracing::info!(
        "starting geo-enrich provider={} cache_ttl={}s sweep={}s",
        cfg.provider_url,
        cfg.cache_ttl_secs,
        cfg.cache_sweep_interval_secs
    );

    // ===== COMPOSITION ROOT =====

    // 1. Shared cache and its janitor
    let cache: Arc<ExpiringCache<GeoMetadata>> =
        Arc::new(ExpiringCache::with_ttl(cfg.cache_ttl()));
    let sweep = cache.start_sweep(cfg.cache_sweep_interval());

    // 2. Outbound adapters and the cache-first resolver
    let provider = Arc::new(HttpGeoProvider::new(&cfg.provider_url, cfg.provider_timeout())?);
    let resolver = Arc::new(CachingGeoResolver::new(cache.clone(), provider));

    let ip_resolver: Arc<dyn IpResolver> = match &cfg.resolver_url {
        Some(url) => {
            tracing::info!("enrichment uses remote resolver at {}", url);
            Arc::new(RemoteIpResolver::new(url, cfg.resolver_timeout())?) as Arc<dyn IpResolver>
        }
        None => {
            tracing::info!("enrichment uses in-process resolver");
            resolver.clone() as Arc<dyn IpResolver>
        }
    };

    // 3. Application service
    let enricher = Arc::new(EnrichmentService::new(ip_resolver));

    // 4. Inbound adapters
    let shutdown = ShutdownController::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let mut servers = JoinSet::new();

    if cfg.resolver_enabled {
        let server = ResolveServer::new(
            cfg.resolver_listen_addr.clone(),
            resolver.clone(),
            shutdown.clone(),
        );
        servers.spawn(async move { server.run().await });
    }

    if cfg.receiver_enabled {
        let receiver = EventReceiver::new(
            cfg.receiver_listen_addr.clone(),
            enricher,
            Arc::new(TracingLogSink::new()),
            shutdown.clone(),
        );
        servers.spawn(async move { receiver.run().await });
    }

    if servers.is_empty() {
        tracing::warn!("no servers enabled, exiting");
        sweep.stop().await;
        return Ok(());
    }

    let mut first_error = None;
    while let Some(joined) = servers.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::error!("server failed: {:?}", e);
            // One server going down takes the others with it.
            shutdown.shutdown();
            first_error.get_or_insert(e);
        }
    }

    if !shutdown.wait_for_drain(cfg.shutdown_grace()).await {
        tracing::warn!("exiting with batches still in flight");
    }
    sweep.stop().await;
    tracing::info!("geo-enrich stopped");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
