// apps/bot/src/messenger.rs
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use shared_models::{DeliveryFailure, Messenger, OutboundMessage, UserId};

/// Delivers outbound messages through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub async fn send_to(&self, chat_id: ChatId, message: &OutboundMessage) -> Result<(), DeliveryFailure> {
        let request = self.bot.send_message(chat_id, message.text.clone());
        let request = match keyboard(message) {
            Some(markup) => request.reply_markup(markup),
            None => request,
        };
        request.await.map_err(classify)?;
        debug!("Delivered message to chat {}", chat_id);
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn deliver(&self, recipient: UserId, message: &OutboundMessage) -> Result<(), DeliveryFailure> {
        self.send_to(ChatId(recipient), message).await
    }
}

fn keyboard(message: &OutboundMessage) -> Option<InlineKeyboardMarkup> {
    if !message.has_actions() {
        return None;
    }
    let rows = message.actions.iter().map(|row| {
        row.iter()
            .map(|action| InlineKeyboardButton::callback(action.label.clone(), action.data.clone()))
            .collect::<Vec<_>>()
    });
    Some(InlineKeyboardMarkup::new(rows))
}

fn classify(err: RequestError) -> DeliveryFailure {
    match err {
        RequestError::Api(ApiError::BotBlocked) => DeliveryFailure::Blocked,
        RequestError::Api(ApiError::ChatNotFound | ApiError::UserDeactivated) => {
            DeliveryFailure::Unreachable(err.to_string())
        }
        RequestError::RetryAfter(wait) => DeliveryFailure::RateLimited {
            retry_after_secs: Some(u64::from(wait.seconds())),
        },
        other => DeliveryFailure::Other(other.to_string()),
    }
}
