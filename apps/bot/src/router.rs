use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::RequestError;
use tracing::{debug, warn};

use conversation_cell::{ConversationController, Event};
use shared_models::{DeliveryFailure, OutboundMessage};

use crate::messenger::TelegramMessenger;

pub fn create_router() -> UpdateHandler<RequestError> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback))
}

async fn on_message(
    msg: Message,
    controller: Arc<ConversationController>,
    messenger: TelegramMessenger,
) -> ResponseResult<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        debug!("Ignoring non-text message in chat {}", msg.chat.id);
        return Ok(());
    };

    let event = Event::from_text(user.id.0 as i64, user.username.clone(), text);
    let replies = controller.handle(event).await;
    send_replies(&messenger, msg.chat.id, &replies).await;
    Ok(())
}

async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    controller: Arc<ConversationController>,
    messenger: TelegramMessenger,
) -> ResponseResult<()> {
    // Stops the client-side spinner whatever the outcome.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let chat_id = q
        .message
        .as_ref()
        .map(|message| message.chat().id)
        .unwrap_or(ChatId(q.from.id.0 as i64));

    let event = Event::from_callback(q.from.id.0 as i64, q.from.username.clone(), data);
    let replies = controller.handle(event).await;
    send_replies(&messenger, chat_id, &replies).await;
    Ok(())
}

async fn send_replies(messenger: &TelegramMessenger, chat_id: ChatId, replies: &[OutboundMessage]) {
    for reply in replies {
        if let Err(failure) = messenger.send_to(chat_id, reply).await {
            warn!("Failed to reply in chat {}: {}", chat_id, failure);
            if matches!(failure, DeliveryFailure::Blocked | DeliveryFailure::Unreachable(_)) {
                break;
            }
        }
    }
}
