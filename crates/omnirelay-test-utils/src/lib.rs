// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Omnirelay integration tests.
//!
//! Provides mock collaborators for fast, deterministic, CI-runnable tests
//! without external services.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock connection transport with scriptable failures
//!   and delivered-frame capture
//! - [`MockPlatform`] - Mock platform gateway with scriptable send results

pub mod mock_platform;
pub mod mock_transport;

pub use mock_platform::MockPlatform;
pub use mock_transport::MockTransport;
