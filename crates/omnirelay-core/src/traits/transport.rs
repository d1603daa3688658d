// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection transport trait: deliver-or-fail push to one live connection.

use async_trait::async_trait;

use crate::error::PushError;

/// Push channel to a specific live connection.
///
/// No buffering guarantee: a push either reaches the endpoint or fails.
/// [`PushError::Gone`] signals the endpoint no longer exists, which the
/// fan-out engine uses to prune the connection registry.
#[async_trait]
pub trait ConnectionTransport: Send + Sync + 'static {
    /// Delivers one serialized frame to the identified connection.
    async fn push(&self, connection_id: &str, frame: &str) -> Result<(), PushError>;
}
