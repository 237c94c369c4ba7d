//! Event Receiver
//!
//! HTTP ingestion endpoint. Each `POST /report` carries one JSON event that
//! becomes a single-record batch, is enriched, and is handed to the
//! downstream sink.

use crate::application::EnrichmentService;
use crate::domain::entities::{LogBatch, LogRecord, EVENT_TYPE_KEY, IP_ADDRESS_KEY, USER_ID_KEY};
use crate::domain::ports::LogSink;
use crate::infrastructure::ShutdownController;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Instrumentation scope name given to ingested records.
pub const RECEIVER_SCOPE: &str = "eventreceiver";

/// Event reported by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Event {
    pub ip_addr: String,
    pub event_type: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: String,
    pub message: String,
}

impl Event {
    /// Convert into a one-record batch. A missing timestamp is stamped
    /// with the receive time.
    pub fn into_batch(self) -> LogBatch {
        let record = LogRecord::new(self.message, self.timestamp.unwrap_or_else(Utc::now))
            .with_attribute(IP_ADDRESS_KEY, self.ip_addr)
            .with_attribute(EVENT_TYPE_KEY, self.event_type)
            .with_attribute(USER_ID_KEY, self.user_id);
        LogBatch::from_records(RECEIVER_SCOPE, vec![record])
    }
}

/// Report response.
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub records: usize,
    pub processed: usize,
}

/// Event receiver state.
#[derive(Clone)]
pub struct ReceiverState {
    pub enricher: Arc<EnrichmentService>,
    pub sink: Arc<dyn LogSink>,
    pub shutdown: ShutdownController,
}

/// HTTP server exposing `POST /report`.
pub struct EventReceiver {
    listen_addr: String,
    state: ReceiverState,
}

impl EventReceiver {
    pub fn new(
        listen_addr: String,
        enricher: Arc<EnrichmentService>,
        sink: Arc<dyn LogSink>,
        shutdown: ShutdownController,
    ) -> Self {
        Self {
            listen_addr,
            state: ReceiverState {
                enricher,
                sink,
                shutdown,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/report", post(report_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until shutdown.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("event receiver listening on {}", listener.local_addr()?);

        let token = self.state.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await?;

        tracing::info!("event receiver stopped");
        Ok(())
    }
}

async fn report_handler(State(state): State<ReceiverState>, body: Bytes) -> Response {
    let event: Event = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "malformed event");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    tracing::info!(
        ip = %event.ip_addr,
        event_type = %event.event_type,
        user_id = %event.user_id,
        "event received"
    );

    let _guard = state.shutdown.batch_guard();
    let mut batch = event.into_batch();
    let report = state
        .enricher
        .enrich(&mut batch, &state.shutdown.token())
        .await;

    match state.sink.consume(batch).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReportResponse {
                records: report.total,
                processed: report.processed,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "downstream rejected batch");
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::entities::{GeoMetadata, COUNTRY_KEY, TIMEZONE_KEY};
    use crate::domain::ports::{IpResolver, ResolveError, SinkError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    // ===== Mock Implementations =====

    struct FixedResolver;

    #[async_trait]
    impl IpResolver for FixedResolver {
        async fn resolve_ip(&self, ip: &str) -> Result<GeoMetadata, ResolveError> {
            if ip == "203.0.113.9" {
                return Err(ResolveError::Upstream);
            }
            Ok(GeoMetadata {
                country: "India".to_string(),
                timezone: "Asia/Kolkata".to_string(),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        batches: Mutex<Vec<LogBatch>>,
        reject: bool,
    }

    #[async_trait]
    impl LogSink for CollectingSink {
        async fn consume(&self, batch: LogBatch) -> Result<(), SinkError> {
            if self.reject {
                return Err(SinkError::Rejected("queue full".to_string()));
            }
            self.batches.lock().unwrap().push(batch);
            Ok(())
        }
    }

    fn create_test_receiver(sink: Arc<CollectingSink>) -> EventReceiver {
        EventReceiver::new(
            "127.0.0.1:0".to_string(),
            Arc::new(EnrichmentService::new(Arc::new(FixedResolver))),
            sink,
            ShutdownController::new(),
        )
    }

    async fn post_report(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/report")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    // ===== Event Tests =====

    #[test]
    fn test_event_into_batch() {
        let event: Event = serde_json::from_str(
            r#"{"ip_addr":"49.36.0.1","event_type":"purchase","timestamp":"2024-03-01T12:00:00Z","user_id":"bob","message":"bought a hat"}"#,
        )
        .unwrap();

        let batch = event.into_batch();
        assert_eq!(batch.record_count(), 1);

        let record = batch.records().next().unwrap();
        assert_eq!(record.body, "bought a hat");
        assert_eq!(record.timestamp.to_rfc3339(), "2024-03-01T12:00:00+00:00");
        assert_eq!(record.attributes.get(IP_ADDRESS_KEY), Some("49.36.0.1"));
        assert_eq!(record.attributes.get(EVENT_TYPE_KEY), Some("purchase"));
        assert_eq!(record.attributes.get(USER_ID_KEY), Some("bob"));
    }

    #[test]
    fn test_event_missing_fields_default() {
        let event: Event = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(event.ip_addr, "");
        assert!(event.timestamp.is_none());

        let batch = event.into_batch();
        let record = batch.records().next().unwrap();
        assert_eq!(record.attributes.get(IP_ADDRESS_KEY), Some(""));
    }

    // ===== Handler Tests =====

    #[tokio::test]
    async fn test_report_enriches_and_forwards() {
        let sink = Arc::new(CollectingSink::default());
        let receiver = create_test_receiver(sink.clone());

        let (status, json) = post_report(
            receiver.router(),
            r#"{"ip_addr":"49.36.0.1","event_type":"login","user_id":"bob","message":"hi"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["records"], 1);
        assert_eq!(json["processed"], 1);

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let record = batches[0].records().next().unwrap();
        assert_eq!(record.attributes.get(COUNTRY_KEY), Some("India"));
        assert_eq!(record.attributes.get(TIMEZONE_KEY), Some("Asia/Kolkata"));
    }

    #[tokio::test]
    async fn test_report_failed_resolution_still_forwarded() {
        let sink = Arc::new(CollectingSink::default());
        let receiver = create_test_receiver(sink.clone());

        let (status, json) = post_report(
            receiver.router(),
            r#"{"ip_addr":"203.0.113.9","event_type":"login","user_id":"eve","message":"hi"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["processed"], 0);

        let batches = sink.batches.lock().unwrap();
        let record = batches[0].records().next().unwrap();
        assert_eq!(record.attributes.get(COUNTRY_KEY), None);
        assert_eq!(record.attributes.len(), 3);
    }

    #[tokio::test]
    async fn test_report_malformed_json() {
        let sink = Arc::new(CollectingSink::default());
        let receiver = create_test_receiver(sink.clone());

        let (status, json) = post_report(receiver.router(), "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_sink_rejection() {
        let sink = Arc::new(CollectingSink {
            reject: true,
            ..Default::default()
        });
        let receiver = create_test_receiver(sink);

        let (status, json) = post_report(receiver.router(), r#"{"ip_addr":"1.1.1.1"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("queue full"));
    }

    #[tokio::test]
    async fn test_report_after_shutdown_skips_enrichment() {
        let sink = Arc::new(CollectingSink::default());
        let receiver = create_test_receiver(sink.clone());
        receiver.state.shutdown.shutdown();

        let (status, json) = post_report(receiver.router(), r#"{"ip_addr":"49.36.0.1"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["processed"], 0);
        assert_eq!(sink.batches.lock().unwrap().len(), 1);
        assert_eq!(receiver.state.shutdown.in_flight(), 0);
    }
}
