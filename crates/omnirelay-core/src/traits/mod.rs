// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The routing core treats platform APIs, the connection transport, and
//! conversation-ownership resolution as external collaborators behind
//! `#[async_trait]` seams, so each can be substituted with a fake in tests.

pub mod assignment;
pub mod platform;
pub mod transport;

pub use assignment::ConversationAssignment;
pub use platform::PlatformGateway;
pub use transport::ConnectionTransport;
