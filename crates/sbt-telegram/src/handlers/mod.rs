//! Telegram update handlers.
//!
//! Text messages become [`IncomingMessage`](sbt_core::domain::IncomingMessage)s, run
//! through the core dispatcher, and the replies go back out through the messenger.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use sbt_core::messaging::port::deliver;

use crate::router::AppState;

mod text;

pub use text::strip_mention;

pub async fn handle_message(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(incoming) = text::incoming(&msg, &state.bot_names()) else {
        debug!(chat = msg.chat.id.0, "ignoring non-text update");
        return Ok(());
    };

    // One message at a time, across all chats.
    let _guard = state.gate.lock().await;
    let replies = state.dispatcher.dispatch(&incoming).await;
    deliver(state.messenger.as_ref(), &incoming, &replies).await;

    Ok(())
}
