use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

/// Anycross error code meaning "request accepted, flow still running".
/// The value is string-compared because the API has been seen returning
/// it both as a string and as a number.
const INVOKE_TIMEOUT_CODE: &str = "5";

/// Raised when the Anycross webhook cannot be invoked successfully.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("webhookUrl is required")]
    MissingUrl,

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: Value },

    /// Special case: Anycross accepted the request but timed out before
    /// replying with the flow result.
    #[error("HTTP {status}: {body}")]
    InvokeTimeout { status: u16, body: Value },
}

fn is_invoke_timeout(body: &Value) -> bool {
    let code = match body.as_object().and_then(|obj| obj.get("code")) {
        Some(code) => code,
        None => return false,
    };
    match code {
        Value::String(s) => s == INVOKE_TIMEOUT_CODE,
        other => other.to_string() == INVOKE_TIMEOUT_CODE,
    }
}

/// POST the payload to the given Anycross webhook URL and return
/// `(status, body)`. Exactly one outbound call, no retries; the response
/// body is decoded as JSON when possible, otherwise kept as raw text.
pub async fn invoke(
    client: &Client,
    webhook_url: &str,
    payload: &Value,
    timeout: Duration,
) -> Result<(u16, Value), TriggerError> {
    if webhook_url.is_empty() {
        return Err(TriggerError::MissingUrl);
    }

    let response = client
        .post(webhook_url)
        .timeout(timeout)
        .json(payload)
        .send()
        .await
        .map_err(|e| TriggerError::Network(e.to_string()))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| TriggerError::Network(e.to_string()))?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if status >= 400 {
        if is_invoke_timeout(&body) {
            return Err(TriggerError::InvokeTimeout { status, body });
        }
        return Err(TriggerError::Http { status, body });
    }

    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timeout_sentinel_matches_string_and_number_codes() {
        assert!(is_invoke_timeout(&json!({"code": "5", "msg": "engine timeout"})));
        assert!(is_invoke_timeout(&json!({"code": 5})));
        assert!(!is_invoke_timeout(&json!({"code": "50"})));
        assert!(!is_invoke_timeout(&json!({"msg": "no code"})));
        assert!(!is_invoke_timeout(&Value::String("plain text".into())));
    }

    #[tokio::test]
    async fn empty_url_is_rejected_before_any_network_call() {
        let client = Client::new();
        let err = invoke(&client, "", &json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, TriggerError::MissingUrl));
    }
}
