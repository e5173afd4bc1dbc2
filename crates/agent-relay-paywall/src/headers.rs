use std::collections::BTreeMap;
use std::fmt;

/// Receipt header used by the current protocol version.
pub const PAYMENT_RESPONSE_HEADER: &str = "payment-response";
/// Receipt header used by the legacy protocol version.
pub const LEGACY_PAYMENT_RESPONSE_HEADER: &str = "x-payment-response";

/// Which protocol version a receipt header belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderVersion {
    /// `Payment-Response`.
    V2,
    /// `X-Payment-Response`.
    V1,
}

impl HeaderVersion {
    /// Versions in lookup order: current first.
    pub const LOOKUP_ORDER: [HeaderVersion; 2] = [HeaderVersion::V2, HeaderVersion::V1];

    /// Canonical (lowercase) header name.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::V2 => PAYMENT_RESPONSE_HEADER,
            Self::V1 => LEGACY_PAYMENT_RESPONSE_HEADER,
        }
    }
}

impl fmt::Display for HeaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header_name())
    }
}

/// Response headers with names folded to lowercase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: BTreeMap<String, String>,
}

impl HeaderMap {
    /// Builds a map from `(name, value)` pairs, in iteration order. Later
    /// pairs win when two names differ only by case.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(name, value)| (name.as_ref().trim().to_ascii_lowercase(), value.into()))
            .collect();
        Self { entries }
    }

    /// Builds a map from a JSON object. Scalar values are stringified;
    /// nested values are dropped. Names that differ only by case resolve in
    /// the object's key order, which is sorted, not the order the log wrote.
    pub fn from_json(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from_pairs(object.iter().filter_map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(text) => text.clone(),
                serde_json::Value::Number(number) => number.to_string(),
                serde_json::Value::Bool(flag) => flag.to_string(),
                _ => return None,
            };
            Some((name, value))
        }))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the receipt token, preferring the current header name.
    ///
    /// A header present with a blank value counts as absent.
    pub fn receipt_token(&self) -> Option<(HeaderVersion, &str)> {
        HeaderVersion::LOOKUP_ORDER.into_iter().find_map(|version| {
            self.get(version.header_name())
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| (version, token))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_ignores_case() {
        let headers = HeaderMap::from_pairs([("Payment-RESPONSE", "abc"), ("Content-Type", "text/html")]);
        assert_eq!(headers.get("payment-response"), Some("abc"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn current_header_wins_over_legacy() {
        let headers = HeaderMap::from_pairs([
            ("X-Payment-Response", "legacy"),
            ("payment-response", "current"),
        ]);
        assert_eq!(headers.receipt_token(), Some((HeaderVersion::V2, "current")));
    }

    #[test]
    fn blank_current_header_falls_back_to_legacy() {
        let headers = HeaderMap::from_pairs([("Payment-Response", "  "), ("x-payment-response", "legacy")]);
        assert_eq!(headers.receipt_token(), Some((HeaderVersion::V1, "legacy")));
    }

    #[test]
    fn case_duplicates_resolve_by_iteration_order() {
        let headers = HeaderMap::from_pairs([("payment-response", "first"), ("PAYMENT-RESPONSE", "second")]);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Payment-Response"), Some("second"));

        let mut object = serde_json::Map::new();
        object.insert("payment-response".into(), "lower".into());
        object.insert("Payment-Response".into(), "title".into());
        let headers = HeaderMap::from_json(&object);
        let expected = object.values().last().and_then(|value| value.as_str());
        assert_eq!(headers.get("payment-response"), expected);
    }

    #[test]
    fn from_json_keeps_scalars_only() {
        let object = json!({"X-Count": 3, "X-Flag": true, "X-Nested": {"a": 1}, "Server": "nginx"});
        let headers = HeaderMap::from_json(object.as_object().expect("object"));
        assert_eq!(headers.get("x-count"), Some("3"));
        assert_eq!(headers.get("x-flag"), Some("true"));
        assert_eq!(headers.get("x-nested"), None);
        assert_eq!(headers.get("server"), Some("nginx"));
        assert!(headers.receipt_token().is_none());
    }
}
