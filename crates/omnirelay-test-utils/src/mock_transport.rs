// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock connection transport for deterministic testing.
//!
//! `MockTransport` implements `ConnectionTransport` with per-connection
//! scripted failures and captures every delivered frame, enabling fan-out
//! tests without a live WebSocket server.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use omnirelay_core::traits::ConnectionTransport;
use omnirelay_core::PushError;

/// Scripted behavior for one connection id.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Script {
    /// Every push fails with `PushError::Gone`.
    Gone,
    /// Every push fails with `PushError::Failed` carrying this reason.
    Fail(String),
}

/// A mock transport that records delivered frames.
///
/// By default every push succeeds; individual connections can be scripted to
/// fail. All state is behind an `Arc`, so clones observe the same deliveries.
#[derive(Clone, Default)]
pub struct MockTransport {
    delivered: Arc<Mutex<Vec<(String, String)>>>,
    scripts: Arc<Mutex<HashMap<String, Script>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script pushes to `connection_id` to fail with `PushError::Gone`.
    pub async fn script_gone(&self, connection_id: &str) {
        self.scripts
            .lock()
            .await
            .insert(connection_id.to_string(), Script::Gone);
    }

    /// Script pushes to `connection_id` to fail transiently.
    pub async fn script_failure(&self, connection_id: &str, reason: &str) {
        self.scripts
            .lock()
            .await
            .insert(connection_id.to_string(), Script::Fail(reason.to_string()));
    }

    /// All `(connection_id, frame)` pairs delivered so far, in push order.
    pub async fn delivered(&self) -> Vec<(String, String)> {
        self.delivered.lock().await.clone()
    }

    /// Frames delivered to one connection.
    pub async fn frames_for(&self, connection_id: &str) -> Vec<String> {
        self.delivered
            .lock()
            .await
            .iter()
            .filter(|(id, _)| id == connection_id)
            .map(|(_, frame)| frame.clone())
            .collect()
    }
}

#[async_trait]
impl ConnectionTransport for MockTransport {
    async fn push(&self, connection_id: &str, frame: &str) -> Result<(), PushError> {
        if let Some(script) = self.scripts.lock().await.get(connection_id) {
            return match script {
                Script::Gone => Err(PushError::Gone),
                Script::Fail(reason) => Err(PushError::Failed(reason.clone())),
            };
        }
        self.delivered
            .lock()
            .await
            .push((connection_id.to_string(), frame.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_successful_pushes() {
        let transport = MockTransport::new();
        transport.push("c-1", "frame-a").await.unwrap();
        transport.push("c-2", "frame-b").await.unwrap();
        transport.push("c-1", "frame-c").await.unwrap();

        assert_eq!(transport.delivered().await.len(), 3);
        assert_eq!(transport.frames_for("c-1").await, vec!["frame-a", "frame-c"]);
    }

    #[tokio::test]
    async fn scripted_gone_fails_without_recording() {
        let transport = MockTransport::new();
        transport.script_gone("c-dead").await;

        let err = transport.push("c-dead", "frame").await.unwrap_err();
        assert!(matches!(err, PushError::Gone));
        assert!(transport.delivered().await.is_empty());
    }

    #[tokio::test]
    async fn scripted_failure_carries_reason() {
        let transport = MockTransport::new();
        transport.script_failure("c-1", "backpressure").await;

        let err = transport.push("c-1", "frame").await.unwrap_err();
        assert!(matches!(err, PushError::Failed(reason) if reason == "backpressure"));
    }
}
