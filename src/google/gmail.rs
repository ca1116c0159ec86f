//! Mail delivery through the Gmail API

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use tracing::debug;

use crate::discovery::ServiceHandle;
use crate::report::notification::compose_message;
use crate::report::PublishResult;

/// `raw` field value for a message: base64url without padding
pub fn encode_raw(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Send an HTML message to a single recipient as the authenticated user
pub async fn send_html(gmail: &ServiceHandle, to: &str, subject: &str, html: &str) -> PublishResult<()> {
    let raw = encode_raw(&compose_message(to, subject, html));
    gmail
        .invoke(
            "users.messages.send",
            &[("userId", "me".to_string())],
            Some(json!({ "raw": raw })),
        )
        .await?;
    debug!(to, "Sent message");
    Ok(())
}
