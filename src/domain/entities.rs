//! Domain Entities - Core business objects
//!
//! Log records flowing through the pipeline and the geolocation metadata
//! attached to them. These types carry no I/O and no external state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Attribute key holding the client IP address of a record.
pub const IP_ADDRESS_KEY: &str = "ip_address";
/// Attribute key holding the event type reported by ingestion.
pub const EVENT_TYPE_KEY: &str = "event_type";
/// Attribute key holding the user identifier reported by ingestion.
pub const USER_ID_KEY: &str = "user_id";

pub const COUNTRY_KEY: &str = "country";
pub const CITY_KEY: &str = "city";
pub const REGION_KEY: &str = "region";
pub const TIMEZONE_KEY: &str = "timezone";
pub const CURRENCY_KEY: &str = "currency";

/// Geolocation metadata resolved for an IP address.
///
/// Missing fields in a provider payload decode as empty strings. A value
/// with every field empty means "no data"; it is also what callers see
/// when a lookup failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoMetadata {
    pub country: String,
    pub city: String,
    pub region: String,
    pub timezone: String,
    pub currency: String,
}

impl GeoMetadata {
    /// True when no field carries data.
    pub fn is_empty(&self) -> bool {
        self.country.is_empty()
            && self.city.is_empty()
            && self.region.is_empty()
            && self.timezone.is_empty()
            && self.currency.is_empty()
    }

    /// The five attributes written into an enriched record, keyed by
    /// their fixed attribute names.
    pub fn attributes(&self) -> [(&'static str, &str); 5] {
        [
            (CITY_KEY, self.city.as_str()),
            (COUNTRY_KEY, self.country.as_str()),
            (CURRENCY_KEY, self.currency.as_str()),
            (REGION_KEY, self.region.as_str()),
            (TIMEZONE_KEY, self.timezone.as_str()),
        ]
    }
}

/// String attributes of a log record.
///
/// Keys are unique. Insertion order is kept so records print the way
/// ingestion built them; overwriting a key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or overwrite the value stored under `key`.
    pub fn put_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.put_str(k, v);
        }
        attrs
    }
}

/// A single structured log record.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub attributes: Attributes,
}

impl LogRecord {
    pub fn new(body: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            body: body.into(),
            timestamp,
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.put_str(key, value);
        self
    }
}

/// Records emitted under one instrumentation scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeLogs {
    pub scope: String,
    pub records: Vec<LogRecord>,
}

/// Scopes emitted by one resource (service, host, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLogs {
    pub resource: Attributes,
    pub scopes: Vec<ScopeLogs>,
}

/// A batch of log records processed together as one unit of enrichment.
///
/// Records are grouped under resource and scope containers. Enrichment
/// treats the nesting as a flat sequence walked in encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBatch {
    pub resources: Vec<ResourceLogs>,
}

impl LogBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch holding the given records under a single resource and scope.
    pub fn from_records(scope: impl Into<String>, records: Vec<LogRecord>) -> Self {
        Self {
            resources: vec![ResourceLogs {
                resource: Attributes::new(),
                scopes: vec![ScopeLogs {
                    scope: scope.into(),
                    records,
                }],
            }],
        }
    }

    /// Total number of records across all containers.
    pub fn record_count(&self) -> usize {
        self.resources
            .iter()
            .flat_map(|r| r.scopes.iter())
            .map(|s| s.records.len())
            .sum()
    }

    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.resources
            .iter()
            .flat_map(|r| r.scopes.iter())
            .flat_map(|s| s.records.iter())
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut LogRecord> {
        self.resources
            .iter_mut()
            .flat_map(|r| r.scopes.iter_mut())
            .flat_map(|s| s.records.iter_mut())
    }
}
