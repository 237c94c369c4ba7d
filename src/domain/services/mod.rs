mod record_enricher;

pub use record_enricher::RecordEnricher;
