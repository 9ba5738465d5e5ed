//! Slack incoming-webhook notifications.

use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::{ImportError, Result};

/// Environment variable holding the webhook URL.
pub const SLACK_WEBHOOK_ENV: &str = "SLACK_WEBHOOK_URL";

const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SlackPayload<'a> {
    text: &'a str,
}

/// Posts `text` to the incoming webhook at `webhook_url`.
pub fn post_message(webhook_url: &str, text: &str) -> Result<()> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(TIMEOUT))
        .build()
        .into();

    let mut response = agent
        .post(webhook_url)
        .send_json(&SlackPayload { text })
        .map_err(|e| ImportError::Slack(format!("failed to send message: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(ImportError::Slack(format!(
            "Slack API error ({}): {}",
            status.as_u16(),
            body
        )));
    }

    info!("Posted summary to Slack");
    Ok(())
}
