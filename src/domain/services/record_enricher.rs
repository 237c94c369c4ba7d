//! Record Enricher Service
//!
//! Pure domain logic for reading the IP attribute of a record and merging
//! geolocation metadata back into it. No I/O, no shared state.

use crate::domain::entities::{GeoMetadata, LogRecord, IP_ADDRESS_KEY};

/// Stateless helpers that mutate a borrowed record.
pub struct RecordEnricher;

impl RecordEnricher {
    /// Read the IP address attribute of a record.
    ///
    /// Returns `None` when the attribute is absent.
    pub fn extract_ip(record: &LogRecord) -> Option<&str> {
        record.attributes.get(IP_ADDRESS_KEY)
    }

    /// Write the five metadata fields into the record's attributes,
    /// overwriting any values already stored under the same keys.
    ///
    /// Empty fields are written too, so an enriched record always carries
    /// all five keys.
    pub fn apply(record: &mut LogRecord, metadata: &GeoMetadata) {
        for (key, value) in metadata.attributes() {
            record.attributes.put_str(key, value);
        }
    }
}
