use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;
use tracing::{info, warn};

use sbt_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use sbt_core::{
    config::Config, dispatch::Dispatcher as CommandDispatcher, messaging::port::MessagingPort,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub dispatcher: Arc<CommandDispatcher>,
    pub messenger: Arc<dyn MessagingPort>,
    /// Telegram username of the bot, without the `@`.
    pub bot_username: Option<String>,
    /// Held while a message is dispatched so handlers see messages one at a time.
    pub gate: Arc<Mutex<()>>,
}

impl AppState {
    /// Names the bot answers to when a message starts with one of them.
    pub fn bot_names(&self) -> Vec<String> {
        self.bot_username
            .iter()
            .chain(self.cfg.bot_name.iter())
            .filter(|n| !n.trim().is_empty())
            .cloned()
            .collect()
    }
}

pub async fn run_polling(
    cfg: Arc<Config>,
    dispatcher: Arc<CommandDispatcher>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            let name = me.username().to_string();
            info!("sbt started: @{name}");
            Some(name)
        }
        Err(e) => {
            warn!("could not look up bot identity: {e}");
            None
        }
    };
    info!("database: {}", cfg.database_path.display());

    // Throttle on top of the adapter's own RetryAfter handling.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState {
        cfg,
        dispatcher,
        messenger,
        bot_username,
        gate: Arc::new(Mutex::new(())),
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
