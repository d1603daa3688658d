// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation-ownership resolution trait.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{MessageOwner, Platform};

/// Resolves which user/company owns a conversation, and therefore which
/// live connections a message fans out to.
///
/// The assignment algorithm is an external concern; the core only consumes
/// the resolved identity. An owner with neither id set means nobody is
/// notified.
#[async_trait]
pub trait ConversationAssignment: Send + Sync + 'static {
    async fn resolve_owner(
        &self,
        conversation_id: &str,
        platform: Platform,
    ) -> Result<MessageOwner, RelayError>;
}

/// Fixed assignment used when conversation routing is configured statically:
/// every conversation belongs to one company (and optionally one user).
#[derive(Debug, Clone, Default)]
pub struct StaticAssignment {
    pub user_id: Option<String>,
    pub company_id: Option<String>,
}

#[async_trait]
impl ConversationAssignment for StaticAssignment {
    async fn resolve_owner(
        &self,
        _conversation_id: &str,
        _platform: Platform,
    ) -> Result<MessageOwner, RelayError> {
        Ok(MessageOwner {
            user_id: self.user_id.clone(),
            company_id: self.company_id.clone(),
        })
    }
}
