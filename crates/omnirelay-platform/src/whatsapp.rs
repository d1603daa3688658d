// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API send client.

use omnirelay_config::PlatformCredentials;
use omnirelay_core::types::{ContentType, OutboundRequest, SendResult};
use omnirelay_core::RelayError;
use serde::Deserialize;
use tracing::debug;

/// Default Graph API base for the WhatsApp Cloud API.
const API_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Send client for the WhatsApp Cloud API.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    creds: PlatformCredentials,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

impl WhatsAppClient {
    pub fn new(client: reqwest::Client, creds: PlatformCredentials) -> Self {
        let base_url = creds
            .api_base
            .clone()
            .unwrap_or_else(|| API_BASE_URL.to_string());
        Self {
            client,
            creds,
            base_url,
        }
    }

    /// Send one outbound message; the conversation id is the recipient
    /// phone number in the Cloud API addressing scheme.
    pub async fn send(&self, outbound: &OutboundRequest) -> Result<SendResult, RelayError> {
        let token = self.creds.access_token.as_deref().ok_or_else(|| {
            RelayError::PlatformSend {
                message: "whatsapp access_token not configured".into(),
                source: None,
            }
        })?;

        let body = build_body(outbound)?;
        let url = format!("{}/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::PlatformSend {
                message: format!("whatsapp request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::PlatformSend {
                message: format!("whatsapp API returned {status}: {body}"),
                source: None,
            });
        }

        let parsed: SendResponse =
            response.json().await.map_err(|e| RelayError::PlatformSend {
                message: format!("whatsapp response malformed: {e}"),
                source: Some(Box::new(e)),
            })?;
        let message_id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| RelayError::PlatformSend {
                message: "whatsapp response carried no message id".into(),
                source: None,
            })?;

        debug!(message_id = %message_id, "whatsapp send accepted");
        Ok(SendResult { message_id })
    }
}

fn build_body(outbound: &OutboundRequest) -> Result<serde_json::Value, RelayError> {
    let content = &outbound.content;
    let to = &outbound.conversation_id;
    match content.kind {
        ContentType::Text => {
            let text = content.text.as_deref().unwrap_or_default();
            Ok(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": text },
            }))
        }
        ContentType::Image | ContentType::Video | ContentType::Audio | ContentType::Document => {
            let link = content.url.as_deref().ok_or_else(|| {
                RelayError::PlatformSend {
                    message: format!("whatsapp {} content requires a url", content.kind),
                    source: None,
                }
            })?;
            let kind = content.kind.to_string();
            let mut body = serde_json::json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": kind,
            });
            body[kind.as_str()] = serde_json::json!({ "link": link });
            Ok(body)
        }
        ContentType::Location | ContentType::Contact => Err(RelayError::PlatformSend {
            message: format!("whatsapp outbound {} content not supported", content.kind),
            source: None,
        }),
    }
}
