//! Telegram adapter (teloxide).
//!
//! This crate implements the `sbt-core` MessagingPort over Telegram Bot API and feeds
//! inbound messages to the core dispatcher.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::time::sleep;
use tracing::warn;

pub mod handlers;
pub mod router;

use sbt_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    /// Send `text` as HTML, optionally threaded under `reply_to`.
    async fn send_html(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef> {
        let sent = retry_once(|| {
            let req = self
                .bot
                .send_message(Self::tg_chat(chat_id), text.to_string())
                .parse_mode(ParseMode::Html);
            match reply_to {
                Some(orig) => req
                    .reply_to_message_id(teloxide::types::MessageId(orig.message_id.0))
                    .allow_sending_without_reply(true),
                None => req,
            }
        })
        .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(sent.id.0),
        })
    }
}

/// Run a Bot API request, honouring a single flood-control `RetryAfter`.
async fn retry_once<T, Fut>(mut op: impl FnMut() -> Fut) -> Result<T>
where
    Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
    Fut::IntoFuture: Send,
{
    match op().await {
        Err(teloxide::RequestError::RetryAfter(wait)) => {
            warn!("telegram flood control, retrying in {}s", wait.as_secs());
            sleep(wait).await;
            op().await.map_err(telegram_error)
        }
        res => res.map_err(telegram_error),
    }
}

fn telegram_error(e: teloxide::RequestError) -> Error {
    Error::External(format!("telegram error: {e}"))
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_html: true,
            supports_direct: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef> {
        self.send_html(chat_id, text, reply_to).await
    }

    /// Private chats share the user's id, so a direct message is a send to that chat.
    /// Telegram refuses it until the user has started a conversation with the bot.
    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<MessageRef> {
        self.send_html(ChatId(user_id.0), text, None).await
    }
}
