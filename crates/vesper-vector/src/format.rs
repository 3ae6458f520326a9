//! Shaping raw search replies into [`SearchHit`]s

use serde_json::Value;
use tracing::warn;

use crate::query::SCORE_ALIAS;
use crate::types::SearchHit;

/// Placeholder used when a payload has no title
pub const MISSING_TITLE: &str = "No title available";
/// Placeholder used when a payload is not valid JSON
pub const INVALID_PAYLOAD_TITLE: &str = "Invalid JSON data";

/// Field carrying the whole JSON document in a search reply
pub const JSON_ROOT_FIELD: &str = "$";

/// One document from a search reply, before interpretation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Extract the title from a stored JSON payload, falling back to a placeholder
pub fn title_from_payload(payload: Option<&str>) -> String {
    let Some(payload) = payload else {
        return MISSING_TITLE.to_string();
    };

    match serde_json::from_str::<Value>(payload) {
        Ok(value) => value
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(MISSING_TITLE)
            .to_string(),
        Err(_) => INVALID_PAYLOAD_TITLE.to_string(),
    }
}

/// Format one raw document. Never fails: a bad payload yields a placeholder
/// title and a missing score yields `NaN`.
pub fn format_document(doc: &RawDocument) -> SearchHit {
    let payload = doc.field(JSON_ROOT_FIELD);
    let title = title_from_payload(payload);
    if title == INVALID_PAYLOAD_TITLE {
        warn!(id = %doc.id, "Search result carries malformed JSON payload");
    }

    let score = match doc.field(SCORE_ALIAS).map(str::parse::<f32>) {
        Some(Ok(score)) => score,
        _ => {
            warn!(id = %doc.id, "Search result has no usable score");
            f32::NAN
        }
    };

    SearchHit {
        id: doc.id.clone(),
        title,
        score,
    }
}

/// Format documents, keeping the order the store returned them in
pub fn format_hits(docs: &[RawDocument]) -> Vec<SearchHit> {
    docs.iter().map(format_document).collect()
}
