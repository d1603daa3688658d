// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Omnirelay message router.
//!
//! Provides the error taxonomy, domain types, and the collaborator traits
//! (platform gateway, connection transport, conversation assignment) that
//! every other Omnirelay crate builds on.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{PushError, RelayError};
pub use traits::{ConnectionTransport, ConversationAssignment, PlatformGateway};
pub use types::{
    Connection, ContentType, DeliveryReport, Direction, MessageOwner, Notification,
    NotificationType, OutboundContent, OutboundRequest, Platform, PushOutcome, QueueAction,
    QueueWorkItem, SendResult, UnifiedMessage,
};
