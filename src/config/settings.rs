use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub feishu: FeishuSettings,
    pub sync: SyncSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeishuSettings {
    pub app_id: String,
    pub app_secret: String,
    pub base_url: String,
    /// Product team chat, target of the `pd` switch.
    pub pd_chat_id: Option<String>,
    /// Operations team chat, target of the `ops` switch.
    pub ops_chat_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SyncSettings {
    /// Per-call webhook timeout when the request does not supply one.
    /// Anycross flows can be slow, hence the generous default.
    pub default_timeout_secs: u64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000u16)?
            .set_default("feishu.app_id", "")?
            .set_default("feishu.app_secret", "")?
            .set_default("feishu.base_url", "https://open.feishu.cn")?
            .set_default("sync.default_timeout_secs", 70u64)?
            // Base configuration file
            .add_source(File::with_name("config/default").required(false))
            // Environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Credentials and chat targets come from the environment in
        // deployment (same variable names the .env file uses).
        if let Ok(app_id) = std::env::var("APP_ID") {
            builder = builder.set_override("feishu.app_id", app_id)?;
        }
        if let Ok(app_secret) = std::env::var("APP_SECRET") {
            builder = builder.set_override("feishu.app_secret", app_secret)?;
        }
        if let Ok(pd_chat) = std::env::var("PD_CHAT_ID") {
            builder = builder.set_override("feishu.pd_chat_id", pd_chat)?;
        }
        if let Ok(ops_chat) = std::env::var("OPS_CHAT_ID") {
            builder = builder.set_override("feishu.ops_chat_id", ops_chat)?;
        }

        builder = builder.add_source(Environment::with_prefix("FEISHU_RELAY"));

        let s = builder.build()?;

        s.try_deserialize()
    }
}
