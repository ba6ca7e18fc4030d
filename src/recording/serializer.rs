// src/recording/serializer.rs
//! Batch serialization into the wire payload
//!
//! A batch becomes one JSON array. If encoding fails the batch is coerced to
//! its `Debug` text so a flush never fails on serialization.

use crate::recording::record::Record;
use crate::utils::errors::Result;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, warn};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Encoded batch ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    /// Serialized body
    pub body: String,

    /// Number of records in the batch
    pub records: usize,

    /// False when the body is a string coercion instead of JSON
    pub is_json: bool,
}

impl Payload {
    pub fn content_type(&self) -> &'static str {
        if self.is_json {
            JSON_CONTENT_TYPE
        } else {
            "text/plain; charset=utf-8"
        }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Serialize a batch of records
pub fn serialize_batch(batch: &[Record]) -> Payload {
    let (body, is_json) = encode_or_coerce(batch);
    debug!("Serialized {} records into {} bytes", batch.len(), body.len());

    Payload {
        body,
        records: batch.len(),
        is_json,
    }
}

/// Strict JSON encoding
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// JSON encoding with a `Debug` fallback
pub fn encode_or_coerce<T: Serialize + Debug + ?Sized>(value: &T) -> (String, bool) {
    match encode(value) {
        Ok(json) => (json, true),
        Err(e) => {
            warn!("{}; coercing batch to text", e);
            (format!("{:?}", value), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::record::{BaseData, BehaviorRecord, CapturedError, ErrorRecord, Extra};
    use crate::utils::errors::MonitorError;
    use serde::Serializer;

    fn base() -> BaseData {
        BaseData {
            app_id: "abc123".into(),
            timestamp: 42,
            source_url: "app://".into(),
            client_agent: "agent".into(),
            session_id: "s1".into(),
        }
    }

    #[test]
    fn test_batch_is_json_array() {
        let batch = vec![
            Record::Error(ErrorRecord::new(base(), CapturedError::new("boom"))),
            Record::Behavior(BehaviorRecord::new(base(), "click", Extra::new())),
        ];

        let payload = serialize_batch(&batch);
        assert!(payload.is_json);
        assert_eq!(payload.records, 2);
        assert_eq!(payload.content_type(), JSON_CONTENT_TYPE);

        let parsed: serde_json::Value = serde_json::from_str(&payload.body).unwrap();
        let items = parsed.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["type"], "error");
        assert_eq!(items[1]["type"], "behavior");
    }

    #[derive(Debug)]
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not encodable"))
        }
    }

    #[test]
    fn test_serialization_failure_coerces() {
        let (body, is_json) = encode_or_coerce(&vec![Unencodable]);
        assert!(!is_json);
        assert_eq!(body, "[Unencodable]");
    }

    #[test]
    fn test_encode_reports_serialization_error() {
        let err = encode(&Unencodable).unwrap_err();
        assert!(matches!(err, MonitorError::SerializationFailed(_)));
        assert!(err.to_string().contains("not encodable"));
    }
}
