// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform API clients for Omnirelay.
//!
//! One client per provider plus [`PlatformRouter`], which implements
//! [`PlatformGateway`] by dispatching over the closed [`Platform`] set.

pub mod messenger;
pub mod signature;
pub mod telegram;
pub mod whatsapp;

use std::time::Duration;

use async_trait::async_trait;
use omnirelay_config::PlatformsConfig;
use omnirelay_core::traits::PlatformGateway;
use omnirelay_core::types::{OutboundRequest, Platform, SendResult};
use omnirelay_core::RelayError;
use tracing::warn;

use crate::messenger::MessengerClient;
use crate::telegram::TelegramClient;
use crate::whatsapp::WhatsAppClient;

/// Routes verification and outbound sends to the per-platform clients.
///
/// All clients share one `reqwest::Client` so connection pooling and the
/// configured send timeout apply uniformly.
#[derive(Debug, Clone)]
pub struct PlatformRouter {
    whatsapp: WhatsAppClient,
    facebook: MessengerClient,
    instagram: MessengerClient,
    telegram: TelegramClient,
    secrets: SecretSet,
}

/// Per-platform webhook secrets, kept separate from the send clients so
/// `verify` stays synchronous and cheap.
#[derive(Debug, Clone, Default)]
struct SecretSet {
    whatsapp: Option<String>,
    facebook: Option<String>,
    instagram: Option<String>,
    telegram: Option<String>,
}

impl PlatformRouter {
    pub fn new(config: &PlatformsConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs))
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to build http client: {e}")))?;

        Ok(Self {
            whatsapp: WhatsAppClient::new(client.clone(), config.whatsapp.clone()),
            facebook: MessengerClient::new(
                client.clone(),
                config.facebook.clone(),
                Platform::Facebook,
            ),
            instagram: MessengerClient::new(
                client.clone(),
                config.instagram.clone(),
                Platform::Instagram,
            ),
            telegram: TelegramClient::new(client, config.telegram.clone()),
            secrets: SecretSet {
                whatsapp: config.whatsapp.app_secret.clone(),
                facebook: config.facebook.app_secret.clone(),
                instagram: config.instagram.app_secret.clone(),
                telegram: config.telegram.app_secret.clone(),
            },
        })
    }

    fn secret_for(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Whatsapp => self.secrets.whatsapp.as_deref(),
            Platform::Facebook => self.secrets.facebook.as_deref(),
            Platform::Instagram => self.secrets.instagram.as_deref(),
            Platform::Telegram => self.secrets.telegram.as_deref(),
        }
    }
}

#[async_trait]
impl PlatformGateway for PlatformRouter {
    fn verify(&self, platform: Platform, payload: &[u8], signature: Option<&str>) -> bool {
        let Some(secret) = self.secret_for(platform) else {
            // No secret configured disables verification for the platform.
            return true;
        };
        let Some(signature) = signature else {
            warn!(%platform, "webhook arrived unsigned while a secret is configured");
            return false;
        };
        match platform {
            Platform::Telegram => signature::verify_secret_token(secret, signature),
            Platform::Whatsapp | Platform::Facebook | Platform::Instagram => {
                signature::verify_sha256_hex(secret, payload, signature)
            }
        }
    }

    async fn send(&self, outbound: &OutboundRequest) -> Result<SendResult, RelayError> {
        match outbound.platform {
            Platform::Whatsapp => self.whatsapp.send(outbound).await,
            Platform::Facebook => self.facebook.send(outbound).await,
            Platform::Instagram => self.instagram.send(outbound).await,
            Platform::Telegram => self.telegram.send(outbound).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router_with_whatsapp_secret(secret: &str) -> PlatformRouter {
        let mut config = PlatformsConfig::default();
        config.whatsapp.app_secret = Some(secret.into());
        PlatformRouter::new(&config).unwrap()
    }

    #[test]
    fn unconfigured_secret_disables_verification() {
        let router = PlatformRouter::new(&PlatformsConfig::default()).unwrap();
        assert!(router.verify(Platform::Whatsapp, b"{}", None));
        assert!(router.verify(Platform::Telegram, b"{}", Some("anything")));
    }

    #[test]
    fn configured_secret_requires_a_signature() {
        let router = router_with_whatsapp_secret("s3cret");
        assert!(!router.verify(Platform::Whatsapp, b"{}", None));
    }

    #[test]
    fn meta_signature_verification_dispatches_to_hmac() {
        let router = router_with_whatsapp_secret("s3cret");
        let payload = br#"{"entry":[]}"#;
        let sig = signature::sign_sha256_hex("s3cret", payload);
        assert!(router.verify(Platform::Whatsapp, payload, Some(&sig)));
        assert!(!router.verify(Platform::Whatsapp, payload, Some("sha256=deadbeef")));
    }

    #[test]
    fn telegram_verification_compares_secret_tokens() {
        let mut config = PlatformsConfig::default();
        config.telegram.app_secret = Some("tg-token".into());
        let router = PlatformRouter::new(&config).unwrap();
        assert!(router.verify(Platform::Telegram, b"", Some("tg-token")));
        assert!(!router.verify(Platform::Telegram, b"", Some("wrong")));
    }

    #[test]
    fn secrets_stay_per_platform() {
        let router = router_with_whatsapp_secret("s3cret");
        // Facebook has no secret, so it verifies anything.
        assert!(router.verify(Platform::Facebook, b"{}", None));
        assert!(!router.verify(Platform::Whatsapp, b"{}", None));
    }
}
