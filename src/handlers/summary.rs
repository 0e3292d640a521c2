use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::time::Instant;

use crate::models::SummaryRequest;
use crate::utils::logging::*;
use crate::utils::AppError;
use crate::AppState;

/// Relay a generated task summary to the configured Feishu chats as a
/// rich-text post. The `pd`/`ops` switches must be JSON `true` to enable
/// their target; with both off nothing is sent.
pub async fn handle_summary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<Value>, AppError> {
    let start_time = Instant::now();
    log_request_received("/api/endpoint", "POST");

    let summary = match &request.summary_text {
        Some(text) => text.trim().to_string(),
        None => {
            log_validation_error("summaryText", "missing");
            return Err(AppError::ValidationError("Missing summaryText".to_string()));
        }
    };
    if summary.is_empty() {
        log_validation_error("summaryText", "empty");
        return Err(AppError::ValidationError("Empty summaryText".to_string()));
    }

    let mut targets: Vec<String> = Vec::new();
    if request.pd_enabled() {
        match &state.settings.feishu.pd_chat_id {
            Some(chat_id) => targets.push(chat_id.clone()),
            None => {
                return Err(AppError::ConfigError("缺少 PD_CHAT_ID 环境变量".to_string()));
            }
        }
    }
    if request.ops_enabled() {
        match &state.settings.feishu.ops_chat_id {
            Some(chat_id) => targets.push(chat_id.clone()),
            None => {
                return Err(AppError::ConfigError("缺少 OPS_CHAT_ID 环境变量".to_string()));
            }
        }
    }

    if targets.is_empty() {
        return Ok(Json(json!({
            "status": "success",
            "message": "未发送：pd/ops 均为 false",
            "targets": []
        })));
    }

    for chat_id in &targets {
        state
            .feishu
            .send_post_from_summary_text(&summary, "任务汇总", Some(chat_id.as_str()), "chat_id")
            .await?;
        log_feishu_message_sent(chat_id, "post");
    }

    let processing_time = start_time.elapsed().as_millis() as u64;
    log_request_processed("/api/endpoint", 200, processing_time);

    Ok(Json(json!({
        "status": "success",
        "message": "已发送到目标群",
        "targets": targets
    })))
}
