use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape crossing the hook bus boundary: `{type, source, timestamp,
/// data, metadata, context}`. `context` never crosses the byte boundary —
/// it exists only for handlers running in the same process to stash
/// request-scoped values (it is always empty after a deserialize round-trip).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub data: T,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(skip)]
    pub context: HashMap<String, Value>,
}

impl<T> Envelope<T> {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: T) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            timestamp: Utc::now(),
            data,
            metadata: HashMap::new(),
            context: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
