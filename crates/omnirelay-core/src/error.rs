// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Omnirelay message routing core.

use thiserror::Error;

/// The primary error type used across all Omnirelay components.
///
/// There is deliberately no `DuplicateMessage` variant: duplicate inbound
/// messages are absorbed by the persistence upsert and are not an error path.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed or incomplete input. Never retried; surfaces as a 4xx.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// The platform provider rejected the send or was unreachable.
    /// Surfaced to the outbound caller, not retried by the core.
    #[error("platform send failed: {message}")]
    PlatformSend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Store unavailability (connection, query, or serialization failure).
    /// Retried via queue redelivery on the processing path.
    #[error("persistence error: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Shorthand for a `Validation` error with the given reason.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

/// Outcome of a single push attempt to one live connection.
///
/// Distinct from [`RelayError`] so the fan-out engine can classify a failed
/// push without inspecting error strings: `Gone` prunes the connection from
/// the registry, `Failed` is transient and only reported.
#[derive(Debug, Error)]
pub enum PushError {
    /// The transport reports the endpoint no longer exists.
    #[error("connection endpoint gone")]
    Gone,

    /// Any other delivery failure (network, timeout, backpressure).
    #[error("push failed: {0}")]
    Failed(String),
}
