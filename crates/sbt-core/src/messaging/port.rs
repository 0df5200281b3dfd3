use async_trait::async_trait;
use tracing::warn;

use crate::{
    domain::{ChatId, IncomingMessage, MessageRef, UserId},
    formatting::{render_html, split_chunks},
    messaging::types::{MessagingCapabilities, Reply},
    Result,
};

/// Cross-messenger port.
///
/// Text handed to the port is already rendered for the platform (HTML when
/// `supports_html`).
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef>;

    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<MessageRef>;
}

/// Send handler replies for `msg`, best-effort: failures are logged, never returned.
pub async fn deliver(messenger: &dyn MessagingPort, msg: &IncomingMessage, replies: &[Reply]) {
    let caps = messenger.capabilities();
    for reply in replies {
        for chunk in split_chunks(reply.text(), caps.max_message_len, caps.supports_html) {
            let chunk = if caps.supports_html {
                render_html(&chunk)
            } else {
                chunk
            };
            let res = match reply {
                Reply::Reply(_) => {
                    messenger
                        .send_text(msg.chat_id(), &chunk, Some(msg.message))
                        .await
                }
                Reply::Say(_) => messenger.send_text(msg.chat_id(), &chunk, None).await,
                Reply::Direct(_) if caps.supports_direct => {
                    messenger.send_direct(msg.sender.user_id, &chunk).await
                }
                Reply::Direct(_) => {
                    messenger
                        .send_text(msg.chat_id(), &chunk, Some(msg.message))
                        .await
                }
            };
            if let Err(e) = res {
                warn!(chat = msg.chat_id().0, "failed to deliver reply: {e}");
            }
        }
    }
}
