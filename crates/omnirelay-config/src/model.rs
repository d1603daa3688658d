// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Omnirelay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Omnirelay configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default sensibly.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OmnirelayConfig {
    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Work queue retry and polling settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Static conversation-ownership assignment.
    #[serde(default)]
    pub assignment: AssignmentConfig,

    /// Per-platform credentials and secrets.
    #[serde(default)]
    pub platforms: PlatformsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "omnirelay.db".to_string()
}

/// Work queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum delivery attempts before an item is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,

    /// Visibility timeout: how long a dequeued item stays locked before it
    /// becomes eligible for redelivery.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: i64,

    /// Maximum items returned per dequeue poll.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Worker poll interval when the queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_max_attempts() -> i32 {
    3
}

fn default_visibility_timeout_secs() -> i64 {
    300
}

fn default_batch_size() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Static conversation-ownership assignment.
///
/// Stands in for an external conversation-assignment service: every
/// conversation is owned by the configured company (and optionally user).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AssignmentConfig {
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub company_id: Option<String>,
}

/// Per-platform credential sections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformsConfig {
    /// Outbound send timeout applied to every platform API call.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    #[serde(default)]
    pub whatsapp: PlatformCredentials,

    #[serde(default)]
    pub facebook: PlatformCredentials,

    #[serde(default)]
    pub instagram: PlatformCredentials,

    #[serde(default)]
    pub telegram: PlatformCredentials,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout_secs(),
            whatsapp: PlatformCredentials::default(),
            facebook: PlatformCredentials::default(),
            instagram: PlatformCredentials::default(),
            telegram: PlatformCredentials::default(),
        }
    }
}

fn default_send_timeout_secs() -> u64 {
    10
}

/// Credentials for one platform.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformCredentials {
    /// API access token. `None` leaves outbound send unconfigured.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Shared secret for webhook signature verification. `None` disables
    /// signature checks for the platform.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Token expected in the webhook verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Override for the platform API base URL (used in tests).
    #[serde(default)]
    pub api_base: Option<String>,
}
