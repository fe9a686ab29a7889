use crate::error::EventError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Consent category an event is recorded under.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EventCategory {
    /// Always allowed; needed for the product to function.
    Essential,
    #[default]
    Analytics,
    Marketing,
    Personalization,
}

/// Closed set of property values. Nested maps are ordered so that the
/// serialized form of an event is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Map(BTreeMap<String, PropertyValue>),
}

pub type Properties = BTreeMap<String, PropertyValue>;

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a `serde_json::Value` for sinks that build their own payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Parse a CLI-style literal: `null`, `true`/`false`, integers, floats,
    /// otherwise a plain string.
    pub fn parse_literal(raw: &str) -> Self {
        match raw {
            "null" => Self::Null,
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => {
                if let Ok(i) = raw.parse::<i64>() {
                    Self::Int(i)
                } else if let Ok(f) = raw.parse::<f64>()
                    && f.is_finite()
                {
                    Self::Float(f)
                } else {
                    Self::String(raw.to_string())
                }
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Properties> for PropertyValue {
    fn from(value: Properties) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One recorded occurrence.
///
/// Fields are private: once an event has been built it can only be read.
/// `timestamp` is taken from the pipeline clock at creation and never
/// changes, including across persistence and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredEvent")]
pub struct Event {
    id: Uuid,
    name: String,
    properties: Properties,
    timestamp: i64,
    category: EventCategory,
    persist: bool,
}

/// Wire shape of an [`Event`]; converted through [`Event::new`]'s name check.
#[derive(Deserialize)]
struct StoredEvent {
    id: Uuid,
    name: String,
    #[serde(default)]
    properties: Properties,
    timestamp: i64,
    #[serde(default)]
    category: EventCategory,
    #[serde(default)]
    persist: bool,
}

impl TryFrom<StoredEvent> for Event {
    type Error = EventError;

    fn try_from(stored: StoredEvent) -> Result<Self, Self::Error> {
        let mut event = Self::new(stored.name, stored.category, stored.timestamp)?
            .with_properties(stored.properties)
            .persisted(stored.persist);
        event.id = stored.id;
        Ok(event)
    }
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        category: EventCategory,
        timestamp: i64,
    ) -> Result<Self, EventError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EventError::EmptyName);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            properties: Properties::new(),
            timestamp,
            category,
            persist: false,
        })
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Mark the event for the persistent metric store.
    pub fn persisted(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }

    pub fn is_persistent(&self) -> bool {
        self.persist
    }

    /// The stored copy of a persisted metric, replayed without the persist
    /// flag so a replay never re-persists itself.
    pub(crate) fn into_replay(mut self) -> Self {
        self.persist = false;
        self
    }

    pub fn properties_json(&self) -> serde_json::Value {
        PropertyValue::Map(self.properties.clone()).to_json()
    }
}

/// Options accepted by `Pipeline::track_event`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackOptions {
    /// Flush right after buffering instead of waiting for the debounce.
    pub send_immediately: bool,
    pub category: EventCategory,
    /// Also save to the persistent metric store on flush.
    pub persist: bool,
}

impl TrackOptions {
    pub fn category(category: EventCategory) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    pub fn immediately(mut self) -> Self {
        self.send_immediately = true;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.persist = true;
        self
    }
}
