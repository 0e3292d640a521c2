use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use httpmock::prelude::*;
use serde_json::json;

use feishu_anycross_relay::config::{FeishuSettings, ServerSettings, Settings, SyncSettings};
use feishu_anycross_relay::handlers::handle_summary;
use feishu_anycross_relay::models::SummaryRequest;
use feishu_anycross_relay::services::JobStore;
use feishu_anycross_relay::utils::AppError;
use feishu_anycross_relay::AppState;

fn test_state(server: &MockServer, pd_chat: Option<&str>, ops_chat: Option<&str>) -> Arc<AppState> {
    let settings = Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        feishu: FeishuSettings {
            app_id: "app".to_string(),
            app_secret: "secret".to_string(),
            base_url: server.base_url(),
            pd_chat_id: pd_chat.map(str::to_string),
            ops_chat_id: ops_chat.map(str::to_string),
        },
        sync: SyncSettings {
            default_timeout_secs: 5,
        },
    };
    Arc::new(AppState {
        settings,
        http: reqwest::Client::new(),
        feishu: feishu::FeishuClient::new("app".to_string(), "secret".to_string())
            .with_base_url(server.base_url()),
        jobs: JobStore::new(),
    })
}

fn summary_request(body: serde_json::Value) -> SummaryRequest {
    serde_json::from_value(body).expect("valid SummaryRequest")
}

const SUMMARY: &str = "今日任务:\n(第1条) @ou_abc, 项目A, 修复登录, 进行中\n";

#[tokio::test]
async fn missing_or_empty_summary_is_rejected() {
    let server = MockServer::start_async().await;
    let state = test_state(&server, Some("oc_pd"), None);

    let err = handle_summary(State(state.clone()), Json(summary_request(json!({}))))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(msg) if msg == "Missing summaryText"));

    let err = handle_summary(
        State(state),
        Json(summary_request(json!({"summaryText": "   "}))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(msg) if msg == "Empty summaryText"));
}

#[tokio::test]
async fn nothing_is_sent_when_both_switches_are_off() {
    let server = MockServer::start_async().await;
    let state = test_state(&server, Some("oc_pd"), Some("oc_ops"));

    // Truthy-but-not-true values do not enable a target either.
    let Json(body) = handle_summary(
        State(state),
        Json(summary_request(
            json!({"summaryText": SUMMARY, "pd": "yes", "ops": 1}),
        )),
    )
    .await
    .unwrap();

    assert_eq!(body["status"], json!("success"));
    assert_eq!(body["targets"], json!([]));
}

#[tokio::test]
async fn enabled_switch_without_configured_chat_is_a_config_error() {
    let server = MockServer::start_async().await;
    let state = test_state(&server, None, None);

    let err = handle_summary(
        State(state),
        Json(summary_request(json!({"summaryText": SUMMARY, "pd": true}))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::ConfigError(_)));
}

#[tokio::test]
async fn summary_is_delivered_to_each_selected_chat() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/open-apis/auth/v3/tenant_access_token/internal");
            then.status(200).json_body(json!({
                "code": 0,
                "tenant_access_token": "t-abc",
                "expire": 7200
            }));
        })
        .await;
    let pd_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/open-apis/im/v1/messages")
                .query_param("receive_id_type", "chat_id")
                .json_body_partial(r#"{"receive_id": "oc_pd", "msg_type": "post"}"#);
            then.status(200).json_body(json!({"code": 0, "msg": "success"}));
        })
        .await;
    let ops_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/open-apis/im/v1/messages")
                .query_param("receive_id_type", "chat_id")
                .json_body_partial(r#"{"receive_id": "oc_ops", "msg_type": "post"}"#);
            then.status(200).json_body(json!({"code": 0, "msg": "success"}));
        })
        .await;

    let state = test_state(&server, Some("oc_pd"), Some("oc_ops"));
    let Json(body) = handle_summary(
        State(state),
        Json(summary_request(
            json!({"summaryText": SUMMARY, "pd": true, "ops": true}),
        )),
    )
    .await
    .unwrap();

    assert_eq!(body["status"], json!("success"));
    assert_eq!(body["targets"], json!(["oc_pd", "oc_ops"]));
    pd_mock.assert_async().await;
    ops_mock.assert_async().await;
}

#[tokio::test]
async fn feishu_api_failure_maps_to_feishu_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/open-apis/auth/v3/tenant_access_token/internal");
            then.status(200)
                .json_body(json!({"code": 99991663, "msg": "app not found"}));
        })
        .await;

    let state = test_state(&server, Some("oc_pd"), None);
    let err = handle_summary(
        State(state),
        Json(summary_request(json!({"summaryText": SUMMARY, "pd": true}))),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::FeishuApi(_)));
}
