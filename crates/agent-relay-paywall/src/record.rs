use serde_json::{Map, Value};

use crate::errors::{RecordError, VerifyError};
use crate::headers::HeaderMap;

/// Role tag of records produced by tool calls.
pub const TOOL_ROLE: &str = "tool";

/// One logged request/response exchange, as the request layer records it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseRecord {
    /// Kind of record (`tool`, `assistant`, ...). Empty when the log omits it.
    #[serde(default)]
    pub role: String,
    /// Name of the call that produced the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<RecordContent>,
}

/// Record content: JSON text or an already-parsed mapping.
///
/// Any other shape (content-part arrays, numbers, ...) is kept as `Other`
/// so one odd record cannot make the whole log unreadable.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum RecordContent {
    Text(String),
    Structured(Map<String, Value>),
    Other(Value),
}

/// Record content after ingestion: always parsed, headers canonicalized.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedContent {
    pub headers: HeaderMap,
    pub body: Map<String, Value>,
}

impl ResponseRecord {
    /// Creates a tool-result record.
    pub fn tool(name: impl Into<String>, content: RecordContent) -> Self {
        Self {
            role: TOOL_ROLE.to_string(),
            name: Some(name.into()),
            content: Some(content),
        }
    }

    /// Whether this record was produced by `call_name` under `role`.
    pub fn matches(&self, role: &str, call_name: &str) -> bool {
        self.role == role && self.name.as_deref() == Some(call_name)
    }

    /// Parses and canonicalizes the content.
    pub fn normalize(&self) -> Result<NormalizedContent, RecordError> {
        match &self.content {
            None => Err(RecordError::EmptyContent),
            Some(content) => content.normalize(),
        }
    }
}

impl RecordContent {
    /// Parses text content as a JSON object and extracts its `headers`.
    pub fn normalize(&self) -> Result<NormalizedContent, RecordError> {
        let body = match self {
            Self::Text(text) if text.trim().is_empty() => return Err(RecordError::EmptyContent),
            Self::Text(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(object)) => object,
                Ok(_) => {
                    return Err(RecordError::MalformedContent(
                        "expected a JSON object".into(),
                    ));
                }
                Err(err) => return Err(RecordError::MalformedContent(err.to_string())),
            },
            Self::Structured(object) => object.clone(),
            Self::Other(value) => {
                return Err(RecordError::MalformedContent(format!(
                    "expected text or a JSON object, got {}",
                    value_kind(value)
                )));
            }
        };

        let headers = match body.get("headers") {
            None | Some(Value::Null) => HeaderMap::default(),
            Some(Value::Object(headers)) => HeaderMap::from_json(headers),
            Some(_) => return Err(RecordError::InvalidHeaders),
        };
        Ok(NormalizedContent { headers, body })
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parses a response log: a JSON array of records, oldest first.
pub fn load_records(json: &str) -> Result<Vec<ResponseRecord>, VerifyError> {
    serde_json::from_str(json).map_err(|err| VerifyError::InvalidLog(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_and_structured_content_normalize_alike() {
        let payload = json!({"status": 200, "headers": {"Payment-Response": "token"}});
        let structured = RecordContent::Structured(payload.as_object().expect("object").clone());
        let text = RecordContent::Text(payload.to_string());

        let a = structured.normalize().expect("structured");
        let b = text.normalize().expect("text");
        assert_eq!(a, b);
        assert_eq!(a.headers.get("payment-response"), Some("token"));
    }

    #[test]
    fn unparsable_text_is_malformed() {
        let err = RecordContent::Text("402 Payment Required".into()).normalize();
        assert!(matches!(err, Err(RecordError::MalformedContent(_))));

        let err = RecordContent::Text("[1, 2]".into()).normalize();
        assert!(matches!(err, Err(RecordError::MalformedContent(msg)) if msg.contains("object")));
    }

    #[test]
    fn missing_headers_become_empty_map() {
        let content = RecordContent::Text(r#"{"status": 402}"#.into())
            .normalize()
            .expect("parsed");
        assert!(content.headers.is_empty());
        assert_eq!(content.body.get("status"), Some(&json!(402)));
    }

    #[test]
    fn non_mapping_headers_are_rejected() {
        let err = RecordContent::Text(r#"{"headers": "oops"}"#.into()).normalize();
        assert_eq!(err, Err(RecordError::InvalidHeaders));
    }

    #[test]
    fn load_records_accepts_both_content_shapes() {
        let log = r#"[
            {"role": "user", "content": "pay for it"},
            {"role": "tool", "name": "web_scraper", "content": "{\"status\": 402}"},
            {"role": "tool", "name": "x402_paywalled_request", "content": {"status": 200}},
            {"role": "assistant"}
        ]"#;
        let records = load_records(log).expect("valid log");
        assert_eq!(records.len(), 4);
        assert!(records[2].matches("tool", "x402_paywalled_request"));
        assert!(matches!(records[2].content, Some(RecordContent::Structured(_))));
        assert_eq!(records[3].normalize(), Err(RecordError::EmptyContent));
    }

    #[test]
    fn odd_records_load_and_fail_only_on_normalize() {
        let log = r#"[
            {"role": "user", "content": [{"type": "text", "text": "buy the track"}]},
            {"name": "x402_paywalled_request", "content": 7}
        ]"#;
        let records = load_records(log).expect("valid log");
        assert!(matches!(records[0].content, Some(RecordContent::Other(Value::Array(_)))));
        assert!(matches!(
            records[0].normalize(),
            Err(RecordError::MalformedContent(msg)) if msg.contains("array")
        ));
        assert_eq!(records[1].role, "");
        assert!(!records[1].matches(TOOL_ROLE, "x402_paywalled_request"));
    }

    #[test]
    fn load_records_rejects_non_sequence() {
        assert!(matches!(load_records(r#"{"role": "tool"}"#), Err(VerifyError::InvalidLog(_))));
    }
}
