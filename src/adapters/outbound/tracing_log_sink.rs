//! Tracing Log Sink
//!
//! Implements LogSink by emitting every enriched record as a structured
//! tracing event.

use crate::domain::entities::LogBatch;
use crate::domain::ports::{LogSink, SinkError};
use async_trait::async_trait;

pub struct TracingLogSink;

impl TracingLogSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingLogSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogSink for TracingLogSink {
    async fn consume(&self, batch: LogBatch) -> Result<(), SinkError> {
        for record in batch.records() {
            let attributes: Vec<String> = record
                .attributes
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            tracing::info!(
                timestamp = %record.timestamp.to_rfc3339(),
                attributes = %attributes.join(" "),
                "{}",
                record.body
            );
        }
        Ok(())
    }
}
