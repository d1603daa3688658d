// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock platform gateway for deterministic testing.
//!
//! `MockPlatform` implements `PlatformGateway` with pre-configured send
//! results, enabling outbound-path tests without external API calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use omnirelay_core::traits::PlatformGateway;
use omnirelay_core::types::{OutboundRequest, Platform, SendResult};
use omnirelay_core::RelayError;

/// A mock platform gateway that returns pre-configured results.
///
/// Results are popped from a FIFO queue. When the queue is empty, a default
/// successful send with id `mock-send-<n>` is returned. Every request is
/// captured for later assertion.
#[derive(Clone)]
pub struct MockPlatform {
    results: Arc<Mutex<VecDeque<Result<SendResult, String>>>>,
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
    verify_all: Arc<AtomicBool>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            verify_all: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Queue a successful send result with the given provider message id.
    pub async fn add_success(&self, message_id: &str) {
        self.results.lock().await.push_back(Ok(SendResult {
            message_id: message_id.to_string(),
        }));
    }

    /// Queue a failed send with the given reason.
    pub async fn add_failure(&self, reason: &str) {
        self.results.lock().await.push_back(Err(reason.to_string()));
    }

    /// Make `verify` reject every payload.
    pub fn reject_signatures(&self) {
        self.verify_all.store(false, Ordering::SeqCst);
    }

    /// Requests captured by `send`, in call order.
    pub async fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformGateway for MockPlatform {
    fn verify(&self, _platform: Platform, _payload: &[u8], _signature: Option<&str>) -> bool {
        self.verify_all.load(Ordering::SeqCst)
    }

    async fn send(&self, outbound: &OutboundRequest) -> Result<SendResult, RelayError> {
        self.requests.lock().await.push(outbound.clone());
        let queued = self.results.lock().await.pop_front();
        match queued {
            Some(Ok(result)) => Ok(result),
            Some(Err(reason)) => Err(RelayError::PlatformSend {
                message: reason,
                source: None,
            }),
            None => {
                let n = self.requests.lock().await.len();
                Ok(SendResult {
                    message_id: format!("mock-send-{n}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnirelay_core::types::OutboundContent;

    fn outbound() -> OutboundRequest {
        OutboundRequest {
            platform: Platform::Whatsapp,
            conversation_id: "conv-1".into(),
            content: OutboundContent::text("hi"),
            metadata: None,
            user_id: None,
            company_id: None,
        }
    }

    #[tokio::test]
    async fn queued_results_pop_in_order() {
        let platform = MockPlatform::new();
        platform.add_success("id-1").await;
        platform.add_failure("down").await;

        let first = platform.send(&outbound()).await.unwrap();
        assert_eq!(first.message_id, "id-1");
        assert!(platform.send(&outbound()).await.is_err());
        assert_eq!(platform.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_queue_yields_default_success() {
        let platform = MockPlatform::new();
        let result = platform.send(&outbound()).await.unwrap();
        assert_eq!(result.message_id, "mock-send-1");
    }

    #[tokio::test]
    async fn verify_can_be_scripted_to_reject() {
        let platform = MockPlatform::new();
        assert!(platform.verify(Platform::Telegram, b"{}", None));
        platform.reject_signatures();
        assert!(!platform.verify(Platform::Telegram, b"{}", None));
    }
}
