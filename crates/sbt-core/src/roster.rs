use std::collections::{HashMap, HashSet};

use tokio::sync::Mutex;

use crate::domain::{normalize_nick, ChatId};

/// Nicknames seen speaking in each chat.
///
/// Chat platforms do not reliably expose member lists to bots, so "is this nick in the
/// channel" means "has this nick said anything here since startup".
#[derive(Default)]
pub struct Roster {
    inner: Mutex<HashMap<i64, HashSet<String>>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, chat_id: ChatId, nick: &str) {
        let nick = normalize_nick(nick);
        if nick.is_empty() {
            return;
        }
        self.inner
            .lock()
            .await
            .entry(chat_id.0)
            .or_default()
            .insert(nick);
    }

    pub async fn contains(&self, chat_id: ChatId, nick: &str) -> bool {
        let nick = normalize_nick(nick);
        self.inner
            .lock()
            .await
            .get(&chat_id.0)
            .map(|set| set.contains(&nick))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn membership_is_per_chat_and_case_insensitive() {
        let roster = Roster::new();
        roster.record(ChatId(1), "@Alice").await;
        assert!(roster.contains(ChatId(1), "alice").await);
        assert!(roster.contains(ChatId(1), "ALICE").await);
        assert!(!roster.contains(ChatId(2), "alice").await);
    }
}
