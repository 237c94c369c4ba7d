//! Enrichment Service - batch enrichment use case
//!
//! Walks every record of a batch, resolves its IP address and merges the
//! returned geolocation attributes back into the record. Per-record
//! failures are absorbed; no record is ever removed from the batch.

use crate::domain::entities::LogBatch;
use crate::domain::ports::IpResolver;
use crate::domain::services::RecordEnricher;
use crate::infrastructure::CancelToken;
use std::sync::Arc;
use tracing::Instrument;

/// Outcome counters for one enriched batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Records in the batch.
    pub total: usize,
    /// Records whose resolve call returned without error.
    pub processed: usize,
    /// Records whose resolve call failed. They are left untouched.
    pub failed: usize,
    /// Records never visited because the batch was cancelled.
    pub skipped: usize,
}

/// Batch enrichment orchestrator.
///
/// Records within a batch are enriched sequentially in encounter order.
/// Concurrent batches are handled by concurrent callers sharing one
/// service.
pub struct EnrichmentService {
    resolver: Arc<dyn IpResolver>,
}

impl EnrichmentService {
    pub fn new(resolver: Arc<dyn IpResolver>) -> Self {
        Self { resolver }
    }

    /// Enrich every record of `batch` in place.
    ///
    /// `cancel` is checked before each record and raced against each
    /// resolve call. Once cancelled, the remaining records stay in the
    /// batch unenriched and are counted as skipped.
    ///
    /// The processed count is recorded on the `enrich` span after the
    /// whole batch has been walked.
    pub async fn enrich(&self, batch: &mut LogBatch, cancel: &CancelToken) -> EnrichReport {
        let span = tracing::info_span!(
            "enrich",
            batch_id = %uuid::Uuid::new_v4(),
            records = batch.record_count(),
            processed = tracing::field::Empty,
        );

        let report = self.walk(batch, cancel).instrument(span.clone()).await;
        span.record("processed", report.processed);
        span.in_scope(|| {
            tracing::info!(failed = report.failed, skipped = report.skipped, "batch enriched");
        });

        report
    }

    async fn walk(&self, batch: &mut LogBatch, cancel: &CancelToken) -> EnrichReport {
        let mut report = EnrichReport {
            total: batch.record_count(),
            ..Default::default()
        };

        for record in batch.records_mut() {
            if cancel.is_cancelled() {
                break;
            }

            let ip = match RecordEnricher::extract_ip(record) {
                Some(ip) => ip.to_string(),
                None => {
                    tracing::warn!("no ip address provided in log record");
                    String::new()
                }
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.resolver.resolve_ip(&ip) => result,
            };

            match result {
                Ok(meta) => {
                    RecordEnricher::apply(record, &meta);
                    report.processed += 1;
                    tracing::debug!(ip = %ip, country = %meta.country, city = %meta.city, "ip resolved");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(ip = %ip, error = %e, "can't resolve ip");
                }
            }
        }

        report.skipped = report.total - report.processed - report.failed;
        if report.skipped > 0 {
            tracing::warn!(skipped = report.skipped, "enrichment cancelled");
        }

        report
    }
}
