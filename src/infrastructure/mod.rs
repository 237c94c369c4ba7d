//! Infrastructure Layer
//!
//! Cross-cutting concerns and infrastructure components.

pub mod expiring_cache;
pub mod shutdown;

pub use expiring_cache::{ExpiringCache, SweepHandle, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
pub use shutdown::{shutdown_signal, CancelToken, InFlightGuard, ShutdownController};
