use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Cache settings
    pub cache_ttl_secs: u64,
    pub cache_sweep_interval_secs: u64,

    // Geo-IP provider settings
    pub provider_url: String,
    pub provider_timeout_ms: u64,

    // Standalone resolver service settings
    pub resolver_enabled: bool,
    pub resolver_listen_addr: String,
    pub resolver_url: Option<String>,
    pub resolver_timeout_ms: u64,

    // Event receiver settings
    pub receiver_enabled: bool,
    pub receiver_listen_addr: String,

    pub shutdown_grace_secs: u64,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 600,
            cache_sweep_interval_secs: 30,
            provider_url: "http://ip-api.com/json".to_string(),
            provider_timeout_ms: 5000,
            resolver_enabled: true,
            resolver_listen_addr: "0.0.0.0:5501".to_string(),
            resolver_url: None,
            resolver_timeout_ms: 5000,
            receiver_enabled: true,
            receiver_listen_addr: "0.0.0.0:5510".to_string(),
            shutdown_grace_secs: 10,
            debug: false,
        }
    }
}

impl Config {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::ZeroDuration("cache_ttl_secs"));
        }
        if self.cache_sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroDuration("cache_sweep_interval_secs"));
        }
        if self.provider_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("provider_timeout_ms"));
        }
        if self.resolver_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("resolver_timeout_ms"));
        }
        if self.provider_url.trim().is_empty() {
            return Err(ConfigError::MissingProviderUrl);
        }
        if matches!(&self.resolver_url, Some(url) if url.trim().is_empty()) {
            return Err(ConfigError::EmptyResolverUrl);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("provider_url is required")]
    MissingProviderUrl,
    #[error("resolver_url must not be empty when set")]
    EmptyResolverUrl,
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn load_config() -> anyhow::Result<Config> {
    let defaults = Config::default();

    let cache_ttl_secs = env_u64("GEOENRICH_CACHE_TTL_SECS", defaults.cache_ttl_secs);
    let cache_sweep_interval_secs = env_u64(
        "GEOENRICH_CACHE_SWEEP_INTERVAL_SECS",
        defaults.cache_sweep_interval_secs,
    );

    let provider_url =
        std::env::var("GEOENRICH_PROVIDER_URL").unwrap_or(defaults.provider_url);
    let provider_timeout_ms =
        env_u64("GEOENRICH_PROVIDER_TIMEOUT_MS", defaults.provider_timeout_ms);

    // Resolver service
    let resolver_enabled = env_flag("GEOENRICH_RESOLVER_ENABLED", defaults.resolver_enabled);
    let resolver_listen_addr = std::env::var("GEOENRICH_RESOLVER_LISTEN_ADDR")
        .unwrap_or(defaults.resolver_listen_addr);
    let resolver_url = std::env::var("GEOENRICH_RESOLVER_URL").ok();
    let resolver_timeout_ms =
        env_u64("GEOENRICH_RESOLVER_TIMEOUT_MS", defaults.resolver_timeout_ms);

    // Event receiver
    let receiver_enabled = env_flag("GEOENRICH_RECEIVER_ENABLED", defaults.receiver_enabled);
    let receiver_listen_addr = std::env::var("GEOENRICH_RECEIVER_LISTEN_ADDR")
        .unwrap_or(defaults.receiver_listen_addr);

    let shutdown_grace_secs =
        env_u64("GEOENRICH_SHUTDOWN_GRACE_SECS", defaults.shutdown_grace_secs);

    let debug = std::env::var("DEBUG").is_ok();

    Ok(Config {
        cache_ttl_secs,
        cache_sweep_interval_secs,
        provider_url,
        provider_timeout_ms,
        resolver_enabled,
        resolver_listen_addr,
        resolver_url,
        resolver_timeout_ms,
        receiver_enabled,
        receiver_listen_addr,
        shutdown_grace_secs,
        debug,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(600));
        assert_eq!(cfg.cache_sweep_interval(), Duration::from_secs(30));
        assert_eq!(cfg.resolver_listen_addr, "0.0.0.0:5501");
        assert_eq!(cfg.receiver_listen_addr, "0.0.0.0:5510");
        assert!(cfg.resolver_url.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_config_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("GEOENRICH_CACHE_TTL_SECS");
        std::env::remove_var("GEOENRICH_RESOLVER_URL");

        let cfg = load_config().unwrap();
        assert_eq!(cfg.cache_ttl_secs, 600);
        assert!(cfg.resolver_url.is_none());
    }

    #[test]
    fn test_load_config_cache_settings() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("GEOENRICH_CACHE_TTL_SECS", "120");
        std::env::set_var("GEOENRICH_CACHE_SWEEP_INTERVAL_SECS", "5");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(120));
        assert_eq!(cfg.cache_sweep_interval(), Duration::from_secs(5));
        std::env::remove_var("GEOENRICH_CACHE_TTL_SECS");
        std::env::remove_var("GEOENRICH_CACHE_SWEEP_INTERVAL_SECS");
    }

    #[test]
    fn test_load_config_provider_settings() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("GEOENRICH_PROVIDER_URL", "http://geo.internal/json");
        std::env::set_var("GEOENRICH_PROVIDER_TIMEOUT_MS", "750");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.provider_url, "http://geo.internal/json");
        assert_eq!(cfg.provider_timeout(), Duration::from_millis(750));
        std::env::remove_var("GEOENRICH_PROVIDER_URL");
        std::env::remove_var("GEOENRICH_PROVIDER_TIMEOUT_MS");
    }

    #[test]
    fn test_load_config_remote_resolver() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("GEOENRICH_RESOLVER_URL", "http://resolver:5501/api/v1/resolve");
        std::env::set_var("GEOENRICH_RESOLVER_TIMEOUT_MS", "1500");
        let cfg = load_config().unwrap();
        assert_eq!(
            cfg.resolver_url.as_deref(),
            Some("http://resolver:5501/api/v1/resolve")
        );
        assert_eq!(cfg.resolver_timeout(), Duration::from_millis(1500));
        std::env::remove_var("GEOENRICH_RESOLVER_URL");
        std::env::remove_var("GEOENRICH_RESOLVER_TIMEOUT_MS");
    }

    #[test]
    fn test_load_config_server_flags() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("GEOENRICH_RESOLVER_ENABLED", "false");
        std::env::set_var("GEOENRICH_RECEIVER_ENABLED", "TRUE");
        std::env::set_var("GEOENRICH_RECEIVER_LISTEN_ADDR", "127.0.0.1:9510");
        let cfg = load_config().unwrap();
        assert!(!cfg.resolver_enabled);
        assert!(cfg.receiver_enabled);
        assert_eq!(cfg.receiver_listen_addr, "127.0.0.1:9510");
        std::env::remove_var("GEOENRICH_RESOLVER_ENABLED");
        std::env::remove_var("GEOENRICH_RECEIVER_ENABLED");
        std::env::remove_var("GEOENRICH_RECEIVER_LISTEN_ADDR");
    }

    #[test]
    fn test_load_config_parse_error_uses_default() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("GEOENRICH_SHUTDOWN_GRACE_SECS", "not_a_number");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.shutdown_grace(), Duration::from_secs(10));
        std::env::remove_var("GEOENRICH_SHUTDOWN_GRACE_SECS");
    }

    #[test]
    fn test_load_config_with_debug() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("DEBUG", "1");
        let cfg = load_config().unwrap();
        assert!(cfg.debug);
        std::env::remove_var("DEBUG");
    }

    #[test]
    fn test_validate_zero_ttl() {
        let cfg = Config {
            cache_ttl_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroDuration("cache_ttl_secs"))
        );
    }

    #[test]
    fn test_validate_zero_sweep_interval() {
        let cfg = Config {
            cache_sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroDuration(_))));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let cfg = Config {
            provider_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroDuration("provider_timeout_ms"))
        );
    }

    #[test]
    fn test_validate_missing_provider_url() {
        let cfg = Config {
            provider_url: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::MissingProviderUrl));
    }

    #[test]
    fn test_validate_empty_resolver_url() {
        let cfg = Config {
            resolver_url: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyResolverUrl));
    }

    #[test]
    fn test_config_clone() {
        let cfg = Config::default();
        let cloned = cfg.clone();
        assert_eq!(cfg.provider_url, cloned.provider_url);
        assert_eq!(cfg.cache_ttl_secs, cloned.cache_ttl_secs);
    }
}
