//! # Feishu Client Crate
//!
//! Client for the Feishu Open API used by the relay service.
//!
//! ## Features
//!
//! - Tenant access token with in-memory caching
//! - Text and rich-text ("post") messages
//! - Summary-text parsing into post content blocks
//!
//! ## Example
//!
//! ```no_run
//! use feishu::FeishuClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FeishuClient::new("app_id".into(), "app_secret".into());
//!     client.send_text("hello", Some("oc_chat"), "chat_id").await?;
//!     Ok(())
//! }
//! ```

/// API client with token caching
pub mod client;

/// Rich-text post building and summary parsing
pub mod post;

pub use client::{FeishuClient, FeishuError, FeishuResult};
pub use post::{build_post_from_sections, parse_sections, parse_task_line, SummarySections, TaskItem};
