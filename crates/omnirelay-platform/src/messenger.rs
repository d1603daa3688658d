// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send client for the Messenger Send API, shared by the Facebook and
//! Instagram variants. The two remain distinct [`Platform`] values so
//! secrets, webhook logs, and idempotency keys stay per-platform.

use omnirelay_config::PlatformCredentials;
use omnirelay_core::types::{ContentType, OutboundRequest, Platform, SendResult};
use omnirelay_core::RelayError;
use serde::Deserialize;
use tracing::debug;

const API_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Send client for a Messenger-style platform (Facebook or Instagram).
#[derive(Debug, Clone)]
pub struct MessengerClient {
    client: reqwest::Client,
    creds: PlatformCredentials,
    platform: Platform,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    message_id: String,
}

impl MessengerClient {
    pub fn new(client: reqwest::Client, creds: PlatformCredentials, platform: Platform) -> Self {
        let base_url = creds
            .api_base
            .clone()
            .unwrap_or_else(|| API_BASE_URL.to_string());
        Self {
            client,
            creds,
            platform,
            base_url,
        }
    }

    /// Send one outbound message; the conversation id is the PSID/IGSID
    /// recipient identifier.
    pub async fn send(&self, outbound: &OutboundRequest) -> Result<SendResult, RelayError> {
        let token = self.creds.access_token.as_deref().ok_or_else(|| {
            RelayError::PlatformSend {
                message: format!("{} access_token not configured", self.platform),
                source: None,
            }
        })?;

        let message = build_message(&outbound.content, self.platform)?;
        let body = serde_json::json!({
            "recipient": { "id": outbound.conversation_id },
            "message": message,
        });
        let url = format!("{}/me/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .query(&[("access_token", token)])
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::PlatformSend {
                message: format!("{} request failed: {e}", self.platform),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::PlatformSend {
                message: format!("{} API returned {status}: {body}", self.platform),
                source: None,
            });
        }

        let parsed: SendResponse =
            response.json().await.map_err(|e| RelayError::PlatformSend {
                message: format!("{} response malformed: {e}", self.platform),
                source: Some(Box::new(e)),
            })?;

        debug!(platform = %self.platform, message_id = %parsed.message_id, "send accepted");
        Ok(SendResult {
            message_id: parsed.message_id,
        })
    }
}

fn build_message(
    content: &omnirelay_core::types::OutboundContent,
    platform: Platform,
) -> Result<serde_json::Value, RelayError> {
    match content.kind {
        ContentType::Text => Ok(serde_json::json!({
            "text": content.text.as_deref().unwrap_or_default(),
        })),
        ContentType::Image | ContentType::Video | ContentType::Audio | ContentType::Document => {
            let url = content.url.as_deref().ok_or_else(|| {
                RelayError::PlatformSend {
                    message: format!("{platform} {} content requires a url", content.kind),
                    source: None,
                }
            })?;
            // The Send API uses "file" for generic documents.
            let attachment_type = match content.kind {
                ContentType::Document => "file".to_string(),
                other => other.to_string(),
            };
            Ok(serde_json::json!({
                "attachment": {
                    "type": attachment_type,
                    "payload": { "url": url },
                },
            }))
        }
        ContentType::Location | ContentType::Contact => Err(RelayError::PlatformSend {
            message: format!("{platform} outbound {} content not supported", content.kind),
            source: None,
        }),
    }
}
