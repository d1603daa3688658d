// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers: webhook handshake and ingestion, outbound messages,
//! liveness.
//!
//! Webhook POSTs fast-ack: verification, logging, and a single enqueue happen
//! inline; everything downstream (normalize, persist, fan-out) runs in the
//! worker. A failure before the enqueue returns a non-2xx so the provider
//! retries; after the enqueue the provider always gets its 200.

use std::collections::HashMap;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use omnirelay_core::types::{OutboundContent, OutboundRequest, Platform};
use omnirelay_core::RelayError;
use omnirelay_storage::queries::logs::{self, WebhookLogEntry};
use serde::Deserialize;
use tracing::{info, warn};

use crate::server::GatewayState;

/// Meta-family signature header.
const HUB_SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Telegram pre-shared secret header.
const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Error response body.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn parse_platform(raw: &str) -> Result<Platform, Response> {
    raw.parse::<Platform>()
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, format!("unknown platform: {raw}")))
}

/// GET /health
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /webhook/{platform} — subscription handshake.
///
/// Echoes `hub.challenge` when `hub.mode` is `subscribe` and the supplied
/// `hub.verify_token` matches the configured one; 401 otherwise.
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Path(platform): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let platform = match parse_platform(&platform) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");

    let expected = configured_verify_token(&state, platform);
    match (mode, token, challenge, expected) {
        (Some("subscribe"), Some(token), Some(challenge), Some(expected)) if token == expected => {
            info!(%platform, "webhook subscription verified");
            challenge.clone().into_response()
        }
        _ => {
            warn!(%platform, "webhook verification rejected");
            error_response(StatusCode::UNAUTHORIZED, "verification failed")
        }
    }
}

fn configured_verify_token(state: &GatewayState, platform: Platform) -> Option<&str> {
    let creds = match platform {
        Platform::Whatsapp => &state.platforms.whatsapp,
        Platform::Facebook => &state.platforms.facebook,
        Platform::Instagram => &state.platforms.instagram,
        Platform::Telegram => &state.platforms.telegram,
    };
    creds.verify_token.as_deref()
}

/// POST /webhook/{platform} — event ingestion.
pub async fn receive_webhook(
    State(state): State<GatewayState>,
    Path(platform): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let platform = match parse_platform(&platform) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let signature = headers
        .get(HUB_SIGNATURE_HEADER)
        .or_else(|| headers.get(TELEGRAM_SECRET_HEADER))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !state
        .platform_gateway
        .verify(platform, &body, signature.as_deref())
    {
        warn!(%platform, "webhook signature rejected");
        log_receipt(
            &state,
            platform,
            "signature_rejected",
            &body,
            signature,
            user_agent,
            401,
            started,
            Some("invalid signature".into()),
        )
        .await;
        return error_response(StatusCode::UNAUTHORIZED, "invalid signature");
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            log_receipt(
                &state,
                platform,
                "malformed_payload",
                &body,
                signature,
                user_agent,
                400,
                started,
                Some(e.to_string()),
            )
            .await;
            return error_response(StatusCode::BAD_REQUEST, format!("malformed payload: {e}"));
        }
    };

    // The normalizer re-derives this downstream; here it only labels the
    // queue item for tracing.
    let provider_message_id = payload
        .get("id")
        .or_else(|| payload.get("messageId"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    if let Err(e) = state
        .dispatcher
        .enqueue_process_message(platform, &provider_message_id, payload)
        .await
    {
        warn!(%platform, error = %e, "failed to enqueue webhook event");
        log_receipt(
            &state,
            platform,
            "enqueue_failed",
            &body,
            signature,
            user_agent,
            500,
            started,
            Some(e.to_string()),
        )
        .await;
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "enqueue failed");
    }

    log_receipt(
        &state, platform, "received", &body, signature, user_agent, 200, started, None,
    )
    .await;
    info!(%platform, provider_message_id, "webhook accepted");
    Json(serde_json::json!({ "status": "accepted" })).into_response()
}

#[allow(clippy::too_many_arguments)]
async fn log_receipt(
    state: &GatewayState,
    platform: Platform,
    event_type: &str,
    body: &Bytes,
    signature: Option<String>,
    user_agent: Option<String>,
    status_code: i32,
    started: Instant,
    error_message: Option<String>,
) {
    let entry = WebhookLogEntry {
        platform: platform.to_string(),
        event_type: event_type.to_string(),
        payload: String::from_utf8(body.to_vec()).ok(),
        signature,
        ip_address: None,
        user_agent,
        status_code: Some(status_code),
        processing_time_ms: Some(started.elapsed().as_millis() as i64),
        error_message,
    };
    if let Err(e) = logs::log_webhook(&state.db, entry).await {
        warn!(error = %e, "failed to record webhook log");
    }
}

/// Request body for POST /messages/{platform}.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundBody {
    pub conversation_id: String,
    pub content: OutboundContent,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

/// POST /messages/{platform} — outbound dispatch.
pub async fn post_message(
    State(state): State<GatewayState>,
    Path(platform): Path<String>,
    Json(body): Json<OutboundBody>,
) -> Response {
    let platform = match parse_platform(&platform) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let request = OutboundRequest {
        platform,
        conversation_id: body.conversation_id,
        content: body.content,
        metadata: body.metadata,
        user_id: body.user_id,
        company_id: body.company_id,
    };

    match state.coordinator.dispatch(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e @ RelayError::Validation { .. }) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ RelayError::PlatformSend { .. }) => {
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
        Err(e) => {
            warn!(error = %e, "outbound dispatch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}
