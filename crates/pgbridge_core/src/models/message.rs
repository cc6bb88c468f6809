//! Messages read from the input stream and the batches handed to loaders.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the input stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Declares (or redeclares) the shape of a stream
    Schema {
        stream: String,
        schema: Value,
        #[serde(default)]
        key_properties: Vec<String>,
    },
    /// One record for a previously declared stream
    Record { stream: String, record: Value },
    /// Opaque checkpoint, echoed once preceding records are loaded
    State { value: Value },
    /// Table version switch; accepted and ignored
    ActivateVersion { stream: String, version: i64 },
}

/// Records of one stream buffered for a single `write_batch` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    /// Stream name as it appeared in the input
    pub stream: String,
    /// Most recent SCHEMA payload for the stream
    pub schema: Value,
    /// Primary key columns declared by the SCHEMA message
    pub key_properties: Vec<String>,
    /// Buffered records, in input order
    pub records: Vec<Value>,
}

impl RecordBatch {
    /// Create an empty batch for a stream.
    pub fn new(stream: impl Into<String>, schema: Value, key_properties: Vec<String>) -> Self {
        Self { stream: stream.into(), schema, key_properties, records: Vec::new() }
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Move the buffered records out, leaving the stream metadata in place.
    pub fn take(&mut self) -> RecordBatch {
        RecordBatch {
            stream: self.stream.clone(),
            schema: self.schema.clone(),
            key_properties: self.key_properties.clone(),
            records: std::mem::take(&mut self.records),
        }
    }
}
