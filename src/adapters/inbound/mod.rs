mod event_receiver;
mod resolve_server;

pub use event_receiver::EventReceiver;
pub use resolve_server::ResolveServer;

// Re-export for external use (e.g., integration tests)
#[allow(unused_imports)]
pub use event_receiver::{Event, ReceiverState, ReportResponse, RECEIVER_SCOPE};
#[allow(unused_imports)]
pub use resolve_server::{HealthResponse, ResolveState};
