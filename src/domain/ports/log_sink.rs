//! Log Sink Port
//!
//! Downstream consumer of enriched batches.

use crate::domain::entities::LogBatch;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("batch rejected: {0}")]
    Rejected(String),
}

/// Consumer that receives batches once enrichment has finished with them.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn consume(&self, batch: LogBatch) -> Result<(), SinkError>;
}
