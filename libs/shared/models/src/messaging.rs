use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::UserId;

/// A tappable option attached to a message. `data` is the encoded command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub data: String,
}

impl Action {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    /// Rows of actions, rendered as an inline keyboard by the transport.
    pub actions: Vec<Vec<Action>>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Action>) -> Self {
        if !row.is_empty() {
            self.actions.push(row);
        }
        self
    }

    pub fn with_action(self, action: Action) -> Self {
        self.with_row(vec![action])
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn action_data(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().flatten().map(|a| a.data.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    #[error("recipient unreachable: {0}")]
    Unreachable(String),

    #[error("recipient blocked the bot")]
    Blocked,

    #[error("rate limited by the messaging platform")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("delivery failed: {0}")]
    Other(String),
}

/// Outbound channel to a single recipient. One attempt per call.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn deliver(&self, recipient: UserId, message: &OutboundMessage) -> Result<(), DeliveryFailure>;
}
