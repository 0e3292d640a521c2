use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /api/endpoint`: a generated summary plus the boolean
/// switches selecting which chats receive it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub summary_text: Option<String>,
    #[serde(default)]
    pub pd: Value,
    #[serde(default)]
    pub ops: Value,
}

impl SummaryRequest {
    /// Only a JSON boolean `true` enables a target; anything else is
    /// treated as off.
    pub fn pd_enabled(&self) -> bool {
        self.pd == Value::Bool(true)
    }

    pub fn ops_enabled(&self) -> bool {
        self.ops == Value::Bool(true)
    }
}

/// Body of `POST /api/task-sync`. With `records` present this is a batch
/// enqueue; otherwise a single record call built from `recordId`/`payload`.
/// Loosely typed fields are validated in the handler so shape errors map
/// to the original per-field messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSyncRequest {
    pub webhook_url: Option<Value>,
    pub record_id: Option<Value>,
    pub payload: Option<Value>,
    pub records: Option<Value>,
    pub timeout: Option<Value>,
}
