use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between any two outbound sends.
    pub global_min_interval: Duration,
    /// Minimum spacing between sends into the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40),
            per_chat_min_interval: Duration::from_millis(1050),
        }
    }
}

/// Earliest free send slot, overall and per chat.
#[derive(Debug)]
struct Schedule {
    cfg: ThrottleConfig,
    next_any: Instant,
    next_in_chat: HashMap<i64, Instant>,
}

impl Schedule {
    fn new(cfg: ThrottleConfig, now: Instant) -> Self {
        Self {
            cfg,
            next_any: now,
            next_in_chat: HashMap::new(),
        }
    }

    /// Book the first slot free for both the whole bot and `chat`.
    fn book(&mut self, chat: i64, now: Instant) -> Instant {
        let chat_free = self.next_in_chat.get(&chat).copied().unwrap_or(now);
        let slot = now.max(self.next_any).max(chat_free);
        self.next_any = slot + self.cfg.global_min_interval;
        self.next_in_chat
            .insert(chat, slot + self.cfg.per_chat_min_interval);
        slot
    }
}

/// MessagingPort decorator that spaces out outbound sends.
///
/// Bursty plugins (the "whelps" chant, per-issue github listings) would otherwise trip
/// the platform's flood control.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    schedule: Mutex<Schedule>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            schedule: Mutex::new(Schedule::new(cfg, Instant::now())),
        }
    }

    async fn wait_turn(&self, chat: i64) {
        let slot = self.schedule.lock().await.book(chat, Instant::now());
        sleep_until(slot).await;
    }
}

#[async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef> {
        self.wait_turn(chat_id.0).await;
        self.inner.send_text(chat_id, text, reply_to).await
    }

    async fn send_direct(&self, user_id: UserId, text: &str) -> Result<MessageRef> {
        // Private chats share the user's id.
        self.wait_turn(user_id.0).await;
        self.inner.send_direct(user_id, text).await
    }
}
