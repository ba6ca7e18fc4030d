// src/recording/record.rs
//! Record model shared by the pipeline and the wire format
//!
//! Every record is one of three tagged variants and carries the same
//! `BaseData` context. On the wire a record is a flat camelCase JSON object:
//!
//! ```text
//! {"type":"error","appId":"abc123","timestamp":1700000000000,
//!  "sourceUrl":"...","clientAgent":"...","sessionId":"01H...",
//!  "errorType":"runtime","message":"boom", ...extras}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;

/// Free-form extra fields supplied by the caller
pub type Extra = Map<String, Value>;

/// Keys an extra map may not override
const RESERVED_KEYS: &[&str] = &[
    "type",
    "appId",
    "timestamp",
    "sourceUrl",
    "clientAgent",
    "sessionId",
];

/// Context attached to every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseData {
    pub app_id: String,

    /// Milliseconds since the epoch
    pub timestamp: i64,

    pub source_url: String,
    pub client_agent: String,
    pub session_id: String,
}

/// A captured observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Error(ErrorRecord),
    Performance(PerformanceRecord),
    Behavior(BehaviorRecord),
}

impl Record {
    pub fn base(&self) -> &BaseData {
        match self {
            Record::Error(r) => &r.base,
            Record::Performance(r) => &r.base,
            Record::Behavior(r) => &r.base,
        }
    }

    /// Wire tag of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Error(_) => "error",
            Record::Performance(_) => "performance",
            Record::Behavior(_) => "behavior",
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Uncaught runtime error
    #[default]
    #[serde(alias = "js")]
    Runtime,

    /// Unhandled promise / future rejection
    #[serde(alias = "promise")]
    Rejection,

    /// Resource that failed to load
    Resource,

    /// Failed outgoing request
    #[serde(alias = "xhr", alias = "fetch")]
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    #[serde(flatten)]
    pub base: BaseData,

    pub error_type: ErrorKind,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,

    /// Component hierarchy reported by a UI framework adapter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_stack: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl ErrorRecord {
    pub fn new(base: BaseData, error: CapturedError) -> Self {
        Self {
            base,
            error_type: error.kind,
            message: error.message,
            stack: error.stack,
            filename: None,
            lineno: None,
            colno: None,
            component_stack: None,
            extra: Extra::new(),
        }
    }

    /// Lift known keys into typed fields, keep the rest as extras
    pub fn absorb(&mut self, mut extra: Extra) {
        strip_reserved(&mut extra);

        if let Some(kind) = take_as::<ErrorKind>(&mut extra, "errorType") {
            self.error_type = kind;
        }
        if let Some(message) = take_string(&mut extra, "message") {
            self.message = message;
        }
        if let Some(stack) = take_string(&mut extra, "stack") {
            self.stack = Some(stack);
        }
        if let Some(filename) = take_string(&mut extra, "filename") {
            self.filename = Some(filename);
        }
        if let Some(lineno) = take_as::<u32>(&mut extra, "lineno") {
            self.lineno = Some(lineno);
        }
        if let Some(colno) = take_as::<u32>(&mut extra, "colno") {
            self.colno = Some(colno);
        }
        if let Some(component_stack) = take_string(&mut extra, "componentStack") {
            self.component_stack = Some(component_stack);
        }

        self.extra.extend(extra);
    }
}

/// Core Web Vitals style rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

/// Where a performance measurement came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricCategory {
    WebVitals,
    Navigation,
    Resource,
    #[default]
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    #[serde(flatten)]
    pub base: BaseData,

    pub name: String,
    pub value: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,

    pub metric_type: MetricCategory,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_type: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl PerformanceRecord {
    pub fn new(base: BaseData, name: impl Into<String>, value: f64) -> Self {
        Self {
            base,
            name: name.into(),
            value,
            rating: None,
            metric_type: MetricCategory::default(),
            navigation_type: None,
            extra: Extra::new(),
        }
    }

    pub fn absorb(&mut self, mut extra: Extra) {
        strip_reserved(&mut extra);

        if let Some(rating) = take_as::<Rating>(&mut extra, "rating") {
            self.rating = Some(rating);
        }
        if let Some(category) = take_as::<MetricCategory>(&mut extra, "metricType") {
            self.metric_type = category;
        }
        if let Some(navigation_type) = take_string(&mut extra, "navigationType") {
            self.navigation_type = Some(navigation_type);
        }

        self.extra.extend(extra);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorRecord {
    #[serde(flatten)]
    pub base: BaseData,

    pub event_name: String,
    pub data: Extra,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,
}

impl BehaviorRecord {
    /// Target and xpath descriptors are lifted from `data` when present
    pub fn new(base: BaseData, event_name: impl Into<String>, data: Extra) -> Self {
        let target = data.get("target").and_then(Value::as_str).map(str::to_string);
        let xpath = data.get("xpath").and_then(Value::as_str).map(str::to_string);

        Self {
            base,
            event_name: event_name.into(),
            data,
            target,
            xpath,
        }
    }
}

/// Error payload handed to `capture_error`
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedError {
    pub kind: ErrorKind,
    pub message: String,
    pub stack: Option<String>,
}

impl CapturedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::default(),
            message: message.into(),
            stack: None,
        }
    }

    /// Message from `Display`, stack from the `source()` chain
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let mut frames = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            frames.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        Self {
            kind: ErrorKind::default(),
            message: error.to_string(),
            stack: (!frames.is_empty()).then(|| frames.join("\n")),
        }
    }

    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl From<&str> for CapturedError {
    fn from(message: &str) -> Self {
        CapturedError::new(message)
    }
}

impl From<String> for CapturedError {
    fn from(message: String) -> Self {
        CapturedError::new(message)
    }
}

impl From<&anyhow::Error> for CapturedError {
    fn from(error: &anyhow::Error) -> Self {
        let stack = error
            .chain()
            .skip(1)
            .map(|cause| format!("caused by: {}", cause))
            .collect::<Vec<_>>();

        Self {
            kind: ErrorKind::default(),
            message: error.to_string(),
            stack: (!stack.is_empty()).then(|| stack.join("\n")),
        }
    }
}

fn strip_reserved(extra: &mut Extra) {
    for key in RESERVED_KEYS {
        extra.remove(*key);
    }
}

fn take_string(extra: &mut Extra, key: &str) -> Option<String> {
    match extra.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn take_as<T: serde::de::DeserializeOwned>(extra: &mut Extra, key: &str) -> Option<T> {
    let value = extra.remove(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(typed) => Some(typed),
        Err(_) => {
            // Keep unparseable values visible on the wire
            extra.insert(key.to_string(), value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> BaseData {
        BaseData {
            app_id: "abc123".into(),
            timestamp: 1_700_000_000_000,
            source_url: "app://home".into(),
            client_agent: "test-agent".into(),
            session_id: "01HSESSION".into(),
        }
    }

    fn extra(value: Value) -> Extra {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_error_wire_shape() {
        let record = Record::Error(ErrorRecord::new(base(), CapturedError::new("boom")));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["type"], "error");
        assert_eq!(json["errorType"], "runtime");
        assert_eq!(json["message"], "boom");
        assert_eq!(json["appId"], "abc123");
        assert_eq!(json["sessionId"], "01HSESSION");
        assert_eq!(json["sourceUrl"], "app://home");
        assert_eq!(json["clientAgent"], "test-agent");
        assert!(json.get("stack").is_none());
    }

    #[test]
    fn test_error_absorbs_known_keys() {
        let mut record = ErrorRecord::new(base(), CapturedError::new("boom"));
        record.absorb(extra(json!({
            "errorType": "promise",
            "filename": "app.js",
            "lineno": 10,
            "colno": 4,
            "sessionId": "spoofed",
            "release": "1.2.3"
        })));

        assert_eq!(record.error_type, ErrorKind::Rejection);
        assert_eq!(record.filename.as_deref(), Some("app.js"));
        assert_eq!(record.lineno, Some(10));
        assert_eq!(record.colno, Some(4));
        assert_eq!(record.base.session_id, "01HSESSION");
        assert_eq!(record.extra.get("release"), Some(&json!("1.2.3")));
        assert!(!record.extra.contains_key("sessionId"));

        let json = serde_json::to_value(Record::Error(record)).unwrap();
        assert_eq!(json["release"], "1.2.3");
        assert_eq!(json["sessionId"], "01HSESSION");
    }

    #[test]
    fn test_performance_absorbs_rating_and_category() {
        let mut record = PerformanceRecord::new(base(), "LCP", 2100.0);
        record.absorb(extra(json!({
            "rating": "needs-improvement",
            "metricType": "web-vitals",
            "navigationType": "navigate"
        })));

        assert_eq!(record.rating, Some(Rating::NeedsImprovement));
        assert_eq!(record.metric_type, MetricCategory::WebVitals);

        let json = serde_json::to_value(Record::Performance(record)).unwrap();
        assert_eq!(json["type"], "performance");
        assert_eq!(json["rating"], "needs-improvement");
        assert_eq!(json["metricType"], "web-vitals");
        assert_eq!(json["navigationType"], "navigate");
    }

    #[test]
    fn test_unparseable_typed_extra_kept() {
        let mut record = PerformanceRecord::new(base(), "custom", 1.0);
        record.absorb(extra(json!({"rating": "excellent"})));
        assert_eq!(record.rating, None);
        assert_eq!(record.extra.get("rating"), Some(&json!("excellent")));
    }

    #[test]
    fn test_behavior_lifts_target() {
        let record = BehaviorRecord::new(
            base(),
            "click",
            extra(json!({"target": "button.buy", "x": 1})),
        );
        assert_eq!(record.target.as_deref(), Some("button.buy"));
        assert!(record.xpath.is_none());

        let json = serde_json::to_value(Record::Behavior(record)).unwrap();
        assert_eq!(json["type"], "behavior");
        assert_eq!(json["eventName"], "click");
        assert_eq!(json["data"]["x"], 1);
    }

    #[test]
    fn test_captured_error_stack_from_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let outer = anyhow::Error::new(inner).context("write failed");

        let captured = CapturedError::from(&outer);
        assert_eq!(captured.message, "write failed");
        assert_eq!(captured.stack.as_deref(), Some("caused by: disk full"));

        let plain = CapturedError::from_error(&std::io::Error::new(
            std::io::ErrorKind::Other,
            "flat",
        ));
        assert_eq!(plain.message, "flat");
        assert!(plain.stack.is_none());
    }
}
