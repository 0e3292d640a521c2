use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::models::{RecordStatus, TaskSyncRequest};
use crate::services::task_sync;
use crate::utils::logging::*;
use crate::utils::AppError;
use crate::AppState;

/// Trigger a sync for a single record (`recordId`/`payload`) or enqueue
/// a batch job (`records`). Batch calls return 202 with a job id to
/// poll; single calls block on the webhook and map the outcome to
/// 200/202/502.
pub async fn handle_task_sync(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TaskSyncRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    log_request_received("/api/task-sync", "POST");

    let webhook_url = request
        .webhook_url
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::ValidationError("webhookUrl is required".to_string()))?;

    if let Some(payload) = &request.payload {
        if !payload.is_object() && !payload.is_null() {
            return Err(AppError::ValidationError(
                "payload must be an object".to_string(),
            ));
        }
    }

    // Fractional seconds are fine; anything non-numeric is rejected with
    // the same per-field style as the other loosely typed fields.
    let timeout = match &request.timeout {
        None | Some(Value::Null) => {
            Duration::from_secs(state.settings.sync.default_timeout_secs)
        }
        Some(value) => value
            .as_f64()
            .filter(|secs| *secs > 0.0)
            .map(Duration::from_secs_f64)
            .ok_or_else(|| {
                AppError::ValidationError("timeout must be a positive number".to_string())
            })?,
    };

    // Single-record call.
    let records = match &request.records {
        None | Some(Value::Null) => {
            let entry = match &request.payload {
                None | Some(Value::Null) => {
                    let record_id = request
                        .record_id
                        .as_ref()
                        .and_then(Value::as_str)
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .ok_or_else(|| {
                            AppError::ValidationError("recordId is required".to_string())
                        })?;
                    Value::String(record_id.to_string())
                }
                Some(payload) => json!({
                    "recordId": request.record_id.clone().unwrap_or(Value::Null),
                    "payload": payload,
                }),
            };

            let result =
                task_sync::process_single_record(&state.http, &webhook_url, &entry, timeout).await;
            let status_code = match result.status {
                RecordStatus::Success => StatusCode::OK,
                RecordStatus::Accepted => StatusCode::ACCEPTED,
                RecordStatus::Error => StatusCode::BAD_GATEWAY,
            };
            return Ok((status_code, Json(serde_json::to_value(&result)?)));
        }
        Some(records) => records,
    };

    // Batch call: records must be a non-empty list.
    let records = records
        .as_array()
        .filter(|list| !list.is_empty())
        .cloned()
        .ok_or_else(|| {
            AppError::ValidationError("records must be a non-empty list".to_string())
        })?;

    let job_id = state.jobs.enqueue(webhook_url, records, timeout).await;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "jobId": job_id
        })),
    ))
}

/// Poll a batch job. Terminal jobs are evicted after this snapshot is
/// taken, so a finished job can be read exactly once.
pub async fn get_task_sync_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/task-sync/status", "GET");

    let job = state
        .jobs
        .get(&job_id, false)
        .await
        .ok_or_else(|| AppError::NotFound("job not found".to_string()))?;

    let response = serde_json::to_value(&job)?;

    if job.status.is_terminal() {
        // Read-once semantics keep the table from growing unbounded.
        state.jobs.get(&job_id, true).await;
        log_info(&format!(
            "job {} evicted after terminal status {:?}",
            job_id, job.status
        ));
    }

    Ok(Json(response))
}
