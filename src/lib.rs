// Relay library: exposes modules for the binary and the tests.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

// Shared application state, one instance behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub http: reqwest::Client,
    pub feishu: feishu::FeishuClient,
    pub jobs: services::JobStore,
}
