// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API send client.

use omnirelay_config::PlatformCredentials;
use omnirelay_core::types::{ContentType, OutboundRequest, SendResult};
use omnirelay_core::RelayError;
use serde::Deserialize;
use tracing::debug;

const API_BASE_URL: &str = "https://api.telegram.org";

/// Send client for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    creds: PlatformCredentials,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<BotMessage>,
}

#[derive(Debug, Deserialize)]
struct BotMessage {
    message_id: i64,
}

impl TelegramClient {
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

    /// Send one outbound message; the conversation id is the chat id.
    pub async fn send(&self, outbound: &OutboundRequest) -> Result<SendResult, RelayError> {
        let token = self.creds.access_token.as_deref().ok_or_else(|| {
            RelayError::PlatformSend {
                message: "telegram access_token not configured".into(),
                source: None,
            }
        })?;

        let (api_method, body) = build_call(outbound)?;
        let url = format!("{}/bot{token}/{api_method}", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RelayError::PlatformSend {
                message: format!("telegram request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let parsed: BotResponse =
            response.json().await.map_err(|e| RelayError::PlatformSend {
                message: format!("telegram response malformed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !parsed.ok {
            return Err(RelayError::PlatformSend {
                message: format!(
                    "telegram API rejected send: {}",
                    parsed.description.unwrap_or_else(|| "no description".into())
                ),
                source: None,
            });
        }

        let message_id = parsed
            .result
            .map(|m| m.message_id.to_string())
            .ok_or_else(|| RelayError::PlatformSend {
                message: "telegram response carried no message id".into(),
                source: None,
            })?;

        debug!(message_id = %message_id, "telegram send accepted");
        Ok(SendResult { message_id })
    }
}

fn build_call(outbound: &OutboundRequest) -> Result<(&'static str, serde_json::Value), RelayError> {
    let chat_id = &outbound.conversation_id;
    let content = &outbound.content;
    match content.kind {
        ContentType::Text => Ok((
            "sendMessage",
            serde_json::json!({
                "chat_id": chat_id,
                "text": content.text.as_deref().unwrap_or_default(),
            }),
        )),
        ContentType::Image => Ok((
            "sendPhoto",
            serde_json::json!({ "chat_id": chat_id, "photo": require_url(content)? }),
        )),
        ContentType::Video => Ok((
            "sendVideo",
            serde_json::json!({ "chat_id": chat_id, "video": require_url(content)? }),
        )),
        ContentType::Audio => Ok((
            "sendAudio",
            serde_json::json!({ "chat_id": chat_id, "audio": require_url(content)? }),
        )),
        ContentType::Document => Ok((
            "sendDocument",
            serde_json::json!({ "chat_id": chat_id, "document": require_url(content)? }),
        )),
        ContentType::Location | ContentType::Contact => Err(RelayError::PlatformSend {
            message: format!("telegram outbound {} content not supported", content.kind),
            source: None,
        }),
    }
}

fn require_url(content: &omnirelay_core::types::OutboundContent) -> Result<&str, RelayError> {
    content.url.as_deref().ok_or_else(|| RelayError::PlatformSend {
        message: format!("telegram {} content requires a url", content.kind),
        source: None,
    })
}
