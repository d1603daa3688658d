// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection registry and notification fan-out for Omnirelay.

pub mod notifier;
pub mod registry;

pub use notifier::{FanoutEngine, FanoutTarget};
pub use registry::ConnectionRegistry;
