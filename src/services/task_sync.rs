use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::models::{RecordEntry, RecordResult};
use crate::services::anycross::{self, TriggerError};
use crate::utils::logging::*;

/// Bitable row field carrying the record id. Forced onto every outgoing
/// payload so the automation always targets the right row.
pub const RECORD_ROW_FIELD: &str = "任务表行";

/// Field skeleton expected by the Bitable automation. Member fields are
/// lists, everything else defaults to an empty string.
pub static DEFAULT_PAYLOAD_TEMPLATE: Lazy<Map<String, Value>> = Lazy::new(|| {
    let template = json!({
        "操作": "同步任务",
        "任务名称": "",
        "任务备注": "",
        "执行者": [],
        "任务截止时间": "",
        "任务状态": "",
        "任务关注者": [],
        "任务评论": "",
    });
    match template {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
});

/// Truthiness used by the id fallback chain: null, false, zero, and
/// empty strings or containers defer to the next candidate.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Validate and reshape one raw record entry into a [`RecordEntry`].
///
/// Pure function; the error string becomes the per-record `message`, the
/// request as a whole is never failed here.
pub fn normalize_record_entry(entry: &Value) -> Result<RecordEntry, String> {
    match entry {
        Value::String(raw) => {
            let record_id = raw.trim();
            if record_id.is_empty() {
                return Err("recordId is empty".to_string());
            }
            Ok(RecordEntry::BareId(record_id.to_string()))
        }
        Value::Object(obj) => {
            let payload = match obj.get("payload") {
                None | Some(Value::Null) => None,
                Some(Value::Object(map)) => Some(map.clone()),
                Some(_) => return Err("payload must be an object".to_string()),
            };

            let candidate = [
                obj.get("recordId"),
                obj.get("id"),
                payload.as_ref().and_then(|p| p.get(RECORD_ROW_FIELD)),
            ]
            .into_iter()
            .flatten()
            .find(|value| !is_falsy(value));

            // The selected candidate must be a non-blank string; a number
            // or whitespace-only id is an error, not a fallback.
            let record_id = match candidate {
                Some(Value::String(raw)) if !raw.trim().is_empty() => raw.trim().to_string(),
                _ => return Err("recordId is required".to_string()),
            };

            match payload {
                Some(payload) => Ok(RecordEntry::IdWithPayload { record_id, payload }),
                None => Ok(RecordEntry::BareId(record_id)),
            }
        }
        _ => Err("Invalid record entry".to_string()),
    }
}

/// Overlay the default template with the caller override and force the
/// row field back to the normalized record id. The id always wins, even
/// when the override tries to set the row field to something else.
pub fn assemble_payload(record_id: &str, payload: Option<&Map<String, Value>>) -> Map<String, Value> {
    let mut final_payload = DEFAULT_PAYLOAD_TEMPLATE.clone();

    if let Some(overrides) = payload {
        for (key, value) in overrides {
            final_payload.insert(key.clone(), value.clone());
        }
    }

    final_payload.insert(RECORD_ROW_FIELD.to_string(), json!(record_id));

    final_payload
}

/// Process one record end to end: normalize, assemble the payload, and
/// invoke the Anycross webhook. All failures are folded into the result;
/// this never returns an error past the boundary.
pub async fn process_single_record(
    client: &Client,
    webhook_url: &str,
    entry: &Value,
    timeout: Duration,
) -> RecordResult {
    let entry = match normalize_record_entry(entry) {
        Ok(entry) => entry,
        Err(message) => return RecordResult::error(None, message),
    };
    let record_id = entry.record_id().to_string();

    let final_payload = assemble_payload(&record_id, entry.payload_override());

    log_info(&format!("Triggering Anycross webhook for record {}", record_id));
    match anycross::invoke(client, webhook_url, &Value::Object(final_payload), timeout).await {
        Ok((http_status, body)) => {
            log_info(&format!(
                "Anycross response for {}: status={} body={}",
                record_id, http_status, body
            ));
            RecordResult::success(record_id, http_status, body)
        }
        Err(err @ TriggerError::InvokeTimeout { .. }) => {
            log_warning(&format!("Anycross invoke timeout for {}: {}", record_id, err));
            RecordResult::accepted(
                record_id,
                "Anycross flow still running (invoke timeout)".to_string(),
                err.to_string(),
            )
        }
        Err(err) => {
            log_error(&format!("Anycross trigger failed for {}: {}", record_id, err));
            RecordResult::error(Some(record_id), err.to_string())
        }
    }
}
