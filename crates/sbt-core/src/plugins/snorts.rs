use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::{normalize_nick, IncomingMessage},
    messaging::types::Reply,
    plugins::{local_today, Today},
    roster::Roster,
    store::SnortStore,
    Result,
};

/// Daily snort tallies for people in the chat.
pub struct SnortsPlugin {
    store: SnortStore,
    roster: Arc<Roster>,
    today: Today,
}

impl SnortsPlugin {
    pub fn new(store: SnortStore, roster: Arc<Roster>) -> Self {
        Self {
            store,
            roster,
            today: local_today,
        }
    }

    pub fn with_today(mut self, today: Today) -> Self {
        self.today = today;
        self
    }

    async fn snort(&self, msg: &IncomingMessage, who: &str) -> Result<String> {
        let nick = if who.eq_ignore_ascii_case("me") {
            msg.sender.nick()
        } else {
            normalize_nick(who)
        };

        if !self.roster.contains(msg.chat_id(), &nick).await {
            return Ok(format!(
                "Cannot snort {nick} a snort, nick not in channel."
            ));
        }

        let n = self.store.record(&nick, (self.today)()).await?;
        Ok(format!("{nick} has snorted {n} snorts today."))
    }

    async fn show(&self) -> Result<String> {
        let rows = self.store.today((self.today)()).await?;
        if rows.is_empty() {
            return Ok("Nobody has snorted a snort today!".to_string());
        }
        Ok(rows
            .iter()
            .map(|(nick, n)| format!("{nick} has snorted {n} snorts today."))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl Plugin for SnortsPlugin {
    fn name(&self) -> &'static str {
        "snorts"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::mention("snort", r"^snort\s@?(?P<who>[\w-]+)")
                .requires(&["who"])
                .help("record a snort. Example: snort me"),
            RuleSpec::mention("show", r"^show\ssnorts").help("list today's snorts"),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let text = match action {
            "snort" => self.snort(msg, caps.get("who").unwrap_or("me")).await?,
            "show" => self.show().await?,
            _ => return Ok(Vec::new()),
        };
        Ok(vec![Reply::Reply(text)])
    }
}
