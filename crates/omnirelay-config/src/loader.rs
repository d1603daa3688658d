// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./omnirelay.toml` > `~/.config/omnirelay/omnirelay.toml`
//! > `/etc/omnirelay/omnirelay.toml` with environment variable overrides via
//! the `OMNIRELAY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::OmnirelayConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/omnirelay/omnirelay.toml` (system-wide)
/// 3. `~/.config/omnirelay/omnirelay.toml` (user XDG config)
/// 4. `./omnirelay.toml` (local directory)
/// 5. `OMNIRELAY_*` environment variables
pub fn load_config() -> Result<OmnirelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OmnirelayConfig::default()))
        .merge(Toml::file("/etc/omnirelay/omnirelay.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("omnirelay/omnirelay.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("omnirelay.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<OmnirelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OmnirelayConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OmnirelayConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OmnirelayConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `OMNIRELAY_QUEUE_MAX_ATTEMPTS` must map
/// to `queue.max_attempts`, not `queue.max.attempts`. Platform sections are
/// nested, so `OMNIRELAY_PLATFORMS_WHATSAPP_ACCESS_TOKEN` maps to
/// `platforms.whatsapp.access_token`.
fn env_provider() -> Env {
    Env::prefixed("OMNIRELAY_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("assignment_", "assignment.", 1)
            .replacen("platforms_whatsapp_", "platforms.whatsapp.", 1)
            .replacen("platforms_facebook_", "platforms.facebook.", 1)
            .replacen("platforms_instagram_", "platforms.instagram.", 1)
            .replacen("platforms_telegram_", "platforms.telegram.", 1)
            .replacen("platforms_", "platforms.", 1);
        mapped.into()
    })
}
