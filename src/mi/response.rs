//! # MI Response Model
//!
//! Structured response of the MI REST `execute` surface. One call executes
//! one or more transactions; each transaction yields records (flat field
//! maps) and, on failure, error fields and a nested message list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Response of one MI `execute` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiResponse {
    #[serde(rename = "nrOfFailedTransactions", default)]
    pub nr_of_failed_transactions: u32,

    #[serde(default)]
    pub results: Vec<TransactionResult>,
}

/// Result of a single transaction within a response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionResult {
    #[serde(default)]
    pub transaction: String,

    /// Output rows, one flat field map per record
    #[serde(default)]
    pub records: Vec<BTreeMap<String, serde_json::Value>>,

    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(rename = "errorCode", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Nested business messages attached to the transaction
    #[serde(default)]
    pub messages: Vec<MiMessage>,
}

/// One business message within a transaction result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiMessage {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}

impl MiResponse {
    /// First non-empty business message across all transaction results,
    /// as a `(code, message)` pair. Falls back to the error fields when no
    /// nested message is present.
    pub fn first_message(&self) -> Option<(String, String)> {
        for result in &self.results {
            for msg in &result.messages {
                if !msg.message.trim().is_empty() {
                    return Some((msg.code.clone(), msg.message.clone()));
                }
            }
        }
        for result in &self.results {
            if let Some(text) = &result.error_message {
                if !text.trim().is_empty() {
                    return Some((
                        result.error_code.clone().unwrap_or_default(),
                        text.clone(),
                    ));
                }
            }
        }
        None
    }

    /// Whether any error-shaped field is present in the response
    pub fn has_error(&self) -> bool {
        self.nr_of_failed_transactions > 0
            || self.results.iter().any(|r| {
                r.error_message
                    .as_deref()
                    .is_some_and(|m| !m.trim().is_empty())
            })
    }

    /// Extract a generated value by trying each candidate field name in
    /// order over all records of all results. The first non-empty match
    /// wins; candidate order is significant and fixed per extraction site.
    pub fn find_field(&self, candidates: &[&str]) -> Option<String> {
        for name in candidates {
            for result in &self.results {
                for record in &result.records {
                    if let Some(value) = record.get(*name) {
                        let text = field_to_string(value);
                        if !text.trim().is_empty() {
                            return Some(text.trim().to_string());
                        }
                    }
                }
            }
        }
        None
    }

    /// Convenience constructor for a successful empty response
    pub fn ok() -> Self {
        Self {
            nr_of_failed_transactions: 0,
            results: vec![TransactionResult::default()],
        }
    }

    /// Convenience constructor for a response carrying one record
    pub fn with_record(fields: &[(&str, &str)]) -> Self {
        let record = fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), serde_json::Value::String((*v).to_string())))
            .collect();
        Self {
            nr_of_failed_transactions: 0,
            results: vec![TransactionResult {
                records: vec![record],
                ..TransactionResult::default()
            }],
        }
    }
}

/// MI record values are strings in practice, but the API occasionally emits
/// bare numbers. Render both without quoting artifacts.
fn field_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_prefers_nested_messages() {
        let response = MiResponse {
            nr_of_failed_transactions: 1,
            results: vec![TransactionResult {
                error_message: Some("generic failure".to_string()),
                error_code: Some("ERR1".to_string()),
                messages: vec![
                    MiMessage {
                        code: String::new(),
                        message: "  ".to_string(),
                    },
                    MiMessage {
                        code: "MOS07713".to_string(),
                        message: "Component is installed in this position".to_string(),
                    },
                ],
                ..TransactionResult::default()
            }],
        };
        let (code, message) = response.first_message().unwrap();
        assert_eq!(code, "MOS07713");
        assert!(message.contains("installed"));
    }

    #[test]
    fn first_message_falls_back_to_error_fields() {
        let response = MiResponse {
            nr_of_failed_transactions: 1,
            results: vec![TransactionResult {
                error_message: Some("The field WHLO is mandatory".to_string()),
                error_code: Some("WMT0101".to_string()),
                ..TransactionResult::default()
            }],
        };
        let (code, message) = response.first_message().unwrap();
        assert_eq!(code, "WMT0101");
        assert!(message.contains("mandatory"));
    }

    #[test]
    fn find_field_respects_candidate_order() {
        let response = MiResponse::with_record(&[("MWNO", "4711"), ("PLPN", "990001")]);
        assert_eq!(
            response.find_field(&["PLPN", "MWNO"]).as_deref(),
            Some("990001")
        );
        assert_eq!(
            response.find_field(&["MWNO", "PLPN"]).as_deref(),
            Some("4711")
        );
        assert_eq!(response.find_field(&["XXXX"]), None);
    }

    #[test]
    fn numeric_record_values_are_rendered() {
        let mut record = BTreeMap::new();
        record.insert("PLPN".to_string(), serde_json::json!(990001));
        let response = MiResponse {
            nr_of_failed_transactions: 0,
            results: vec![TransactionResult {
                records: vec![record],
                ..TransactionResult::default()
            }],
        };
        assert_eq!(response.find_field(&["PLPN"]).as_deref(), Some("990001"));
    }

    #[test]
    fn deserializes_rest_payload() {
        let raw = r#"{
            "nrOfFailedTransactions": 0,
            "results": [
                {
                    "transaction": "Get",
                    "records": [{"MWNO": "WO0004711", "STAT": "20"}]
                }
            ]
        }"#;
        let response: MiResponse = serde_json::from_str(raw).unwrap();
        assert!(!response.has_error());
        assert_eq!(response.find_field(&["MWNO"]).as_deref(), Some("WO0004711"));
    }
}
