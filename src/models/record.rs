use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record entry from the sync request. Clients may send either a bare
/// record id string or an object carrying an id plus a partial payload
/// override. The shape is decided here, at the parsing boundary; anything
/// else is rejected per record (never as a whole-request failure).
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    BareId(String),
    IdWithPayload {
        record_id: String,
        payload: Map<String, Value>,
    },
}

impl RecordEntry {
    pub fn record_id(&self) -> &str {
        match self {
            RecordEntry::BareId(id) => id,
            RecordEntry::IdWithPayload { record_id, .. } => record_id,
        }
    }

    pub fn payload_override(&self) -> Option<&Map<String, Value>> {
        match self {
            RecordEntry::BareId(_) => None,
            RecordEntry::IdWithPayload { payload, .. } => Some(payload),
        }
    }
}

/// Outcome of a single record sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    /// Anycross accepted the trigger but the downstream flow had not
    /// finished when the invoke call timed out.
    Accepted,
    Error,
}

/// Result of processing one record entry. Either `(http, body)` or
/// `(message[, detail])` is populated depending on the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResult {
    pub record_id: Option<String>,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl RecordResult {
    pub fn success(record_id: String, http: u16, body: Value) -> Self {
        Self {
            record_id: Some(record_id),
            status: RecordStatus::Success,
            http: Some(http),
            body: Some(body),
            message: None,
            detail: None,
        }
    }

    pub fn accepted(record_id: String, message: String, detail: String) -> Self {
        Self {
            record_id: Some(record_id),
            status: RecordStatus::Accepted,
            http: None,
            body: None,
            message: Some(message),
            detail: Some(detail),
        }
    }

    pub fn error(record_id: Option<String>, message: String) -> Self {
        Self {
            record_id,
            status: RecordStatus::Error,
            http: None,
            body: None,
            message: Some(message),
            detail: None,
        }
    }
}
