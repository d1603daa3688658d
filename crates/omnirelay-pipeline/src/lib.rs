// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message processing pipeline for Omnirelay.
//!
//! Inbound: webhook payloads are enqueued by the gateway, then the worker
//! normalizes, persists idempotently, resolves the owning identity, and fans
//! out. Outbound: the coordinator sends through the platform gateway first
//! and persists after the provider confirms.

pub mod dispatcher;
pub mod normalizer;
pub mod outbound;
pub mod persist;
pub mod worker;

pub use dispatcher::{LeasedItem, QueueDispatcher};
pub use outbound::{OutboundCoordinator, OutboundResponse};
pub use persist::PersistenceStage;
pub use worker::Worker;
