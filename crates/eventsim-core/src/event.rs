//! Event Types for eventsim
//!
//! Wire-level types shared by the pull API and the webhook push.
//! Everything here serializes to the JSON shape downstream consumers expect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::User;

/// Timestamp written in place of a real one when a record is corrupted.
pub const INVALID_TIMESTAMP: &str = "invalid-timestamp";

// ============================================================================
// Vocabularies
// ============================================================================

/// Kind of user activity an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Click,
    View,
    Purchase,
    Signup,
    Pray,
    Share,
    Like,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Click,
        EventType::View,
        EventType::Purchase,
        EventType::Signup,
        EventType::Pray,
        EventType::Share,
        EventType::Like,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::View => "view",
            Self::Purchase => "purchase",
            Self::Signup => "signup",
            Self::Pray => "pray",
            Self::Share => "share",
            Self::Like => "like",
        }
    }

    /// Whether events of this type reference a content item
    pub fn references_content(&self) -> bool {
        matches!(self, Self::View | Self::Like | Self::Share)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client platform an event came from.
///
/// The pull API lets callers force any source string, so unknown values
/// survive as `Other` and serialize back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    Web,
    Apple,
    Android,
    Other(String),
}

impl Source {
    /// The platforms the synthesizer draws from
    pub const KNOWN: [Source; 3] = [Source::Web, Source::Apple, Source::Android];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Web => "web",
            Self::Apple => "apple",
            Self::Android => "android",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        match s.as_str() {
            "web" => Self::Web,
            "apple" => Self::Apple,
            "android" => Self::Android,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        match source {
            Source::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for PropertyValue {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

/// Property bag attached to every event. Ordered so payloads are stable.
pub type Properties = BTreeMap<String, PropertyValue>;

// ============================================================================
// Event
// ============================================================================

/// Reference to the acting user.
///
/// Rich catalogs embed the whole user record; bare catalogs only the id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum UserRef {
    Record(User),
    Id(String),
}

impl UserRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Record(user) => &user.user_id,
            Self::Id(id) => id,
        }
    }
}

/// A single synthesized activity record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: String,
    /// `None` serializes as `null`; consumers must cope with it
    pub user_id: Option<UserRef>,
    pub event_type: EventType,
    pub source: Source,
    pub timestamp: String,
    pub properties: Properties,
}

impl Event {
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// True when `timestamp` parses as RFC 3339
    pub fn has_valid_timestamp(&self) -> bool {
        chrono::DateTime::parse_from_rfc3339(&self.timestamp).is_ok()
    }
}

/// Unit of webhook delivery: `{"events": [...]}`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> Event {
        let mut properties = Properties::new();
        properties.insert("amount".to_string(), PropertyValue::from(12.5));
        properties.insert("product_id".to_string(), PropertyValue::from("prod_7"));
        Event {
            event_id: "evt-1".to_string(),
            user_id: Some(UserRef::Id("user_3".to_string())),
            event_type: EventType::Purchase,
            source: Source::Apple,
            timestamp: "2025-03-01T10:00:00Z".to_string(),
            properties,
        }
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(sample_event()).unwrap();

        assert_eq!(json["event_type"], "purchase");
        assert_eq!(json["source"], "apple");
        assert_eq!(json["user_id"], "user_3");
        assert_eq!(json["properties"]["amount"], 12.5);
        assert_eq!(json["properties"]["product_id"], "prod_7");
    }

    #[test]
    fn test_missing_user_serializes_as_null() {
        let mut event = sample_event();
        event.user_id = None;

        let json = serde_json::to_value(&event).unwrap();
        assert!(json["user_id"].is_null());
    }

    #[test]
    fn test_custom_source_survives_serialization() {
        let mut event = sample_event();
        event.source = Source::from("smart-tv");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"source\":\"smart-tv\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source, Source::Other("smart-tv".to_string()));
        assert_eq!(Source::from("android"), Source::Android);
    }

    #[test]
    fn test_property_scalars_deserialize() {
        let props: Properties =
            serde_json::from_str(r#"{"retries": 3, "beta": true, "ratio": 0.5, "tier": "gold"}"#)
                .unwrap();

        assert_eq!(props["retries"], PropertyValue::Int(3));
        assert_eq!(props["beta"], PropertyValue::Bool(true));
        assert_eq!(props["ratio"].as_f64(), Some(0.5));
        assert_eq!(props["tier"].as_str(), Some("gold"));
        assert_eq!(props["retries"].as_f64(), Some(3.0));
        assert_eq!(props["beta"].as_str(), None);
    }

    #[test]
    fn test_timestamp_validity() {
        let mut event = sample_event();
        assert!(event.has_valid_timestamp());

        event.timestamp = INVALID_TIMESTAMP.to_string();
        assert!(!event.has_valid_timestamp());
    }

    #[test]
    fn test_batch_envelope() {
        let batch = EventBatch::new(vec![sample_event(), sample_event()]);
        let json = serde_json::to_value(&batch).unwrap();

        assert_eq!(json["events"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }
}
