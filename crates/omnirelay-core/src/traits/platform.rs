// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform gateway trait: webhook signature verification and outbound send.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{OutboundRequest, Platform, SendResult};

/// Interface the core presents for per-platform webhook verification and
/// outbound delivery.
///
/// Implementations dispatch over the closed [`Platform`] set; the core never
/// branches on platform strings itself.
#[async_trait]
pub trait PlatformGateway: Send + Sync + 'static {
    /// Verifies a webhook payload signature for the given platform.
    ///
    /// A missing signature verifies only when the platform has no secret
    /// configured (verification disabled).
    fn verify(&self, platform: Platform, payload: &[u8], signature: Option<&str>) -> bool;

    /// Sends an outbound message through the platform's API.
    ///
    /// Fails with [`RelayError::PlatformSend`] when the provider rejects the
    /// message or is unreachable; the core does not retry.
    async fn send(&self, outbound: &OutboundRequest) -> Result<SendResult, RelayError>;
}
