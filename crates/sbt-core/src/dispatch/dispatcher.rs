use std::{sync::Arc, time::Duration};

use tracing::{debug, error, warn};

use crate::{
    config::DEFAULT_REPLY,
    dispatch::registry::{Captures, Registry, Rule},
    domain::IncomingMessage,
    messaging::types::Reply,
    roster::Roster,
};

/// Sent when a handler fails in a way it could not explain to the user.
pub const APOLOGY: &str = "Oops, something broke while handling that. Sorry!";

const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Dispatcher {
    registry: Arc<Registry>,
    roster: Arc<Roster>,
    default_reply: String,
    handler_timeout: Duration,
}

fn is_help(body: &str) -> bool {
    matches!(body.trim().to_lowercase().as_str(), "help" | "halp")
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, roster: Arc<Roster>) -> Self {
        Self {
            registry,
            roster,
            default_reply: DEFAULT_REPLY.to_string(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn roster(&self) -> Arc<Roster> {
        self.roster.clone()
    }

    /// Route one inbound message and collect every reply it produced.
    pub async fn dispatch(&self, msg: &IncomingMessage) -> Vec<Reply> {
        self.roster.record(msg.chat_id(), &msg.sender.nick()).await;

        let mut replies = Vec::new();
        let mut answered = false;

        if let Some(body) = msg.addressed.as_deref() {
            debug!(
                chat = msg.chat_id().0,
                from = %msg.sender.nick(),
                "addressed: {body}"
            );
            if is_help(body) {
                replies.push(Reply::Direct(self.registry.help_text()));
                answered = true;
            } else if let Some((rule, caps)) = self.registry.mention_match(body) {
                replies.extend(self.run(rule, msg, caps).await);
                answered = true;
            }
        }

        for (rule, caps) in self.registry.listen_matches(&msg.text) {
            replies.extend(self.run(rule, msg, caps).await);
            answered = true;
        }

        if msg.is_addressed() && !answered {
            replies.push(Reply::Reply(self.default_reply.clone()));
        }
        replies
    }

    async fn run(&self, rule: &Rule, msg: &IncomingMessage, caps: Captures) -> Vec<Reply> {
        let label = rule.label();
        let plugin = rule.plugin.clone();
        let action = rule.action;
        let owned = msg.clone();

        // Spawned so a panicking handler surfaces as a JoinError instead of unwinding here.
        let mut task =
            tokio::spawn(async move { plugin.handle(action, &owned, &caps).await });

        match tokio::time::timeout(self.handler_timeout, &mut task).await {
            Ok(Ok(Ok(replies))) => replies,
            Ok(Ok(Err(e))) => match e.user_message() {
                Some(text) => vec![Reply::Reply(text)],
                None => {
                    error!(handler = %label, "handler failed: {e}");
                    vec![Reply::Reply(APOLOGY.to_string())]
                }
            },
            Ok(Err(join)) => {
                error!(handler = %label, "handler panicked: {join}");
                Vec::new()
            }
            Err(_) => {
                task.abort();
                warn!(
                    handler = %label,
                    "handler timed out after {}ms",
                    self.handler_timeout.as_millis()
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::{Plugin, RuleSpec},
        domain::{ChatId, MessageId, MessageRef, Sender, UserId},
        errors::Error,
        Result,
    };
    use async_trait::async_trait;

    struct Towelie;

    #[async_trait]
    impl Plugin for Towelie {
        fn name(&self) -> &'static str {
            "towelie"
        }

        fn rules(&self) -> Vec<RuleSpec> {
            vec![
                RuleSpec::mention("echo", r"^echo\s(?P<what>.+)$").help("echo things"),
                RuleSpec::mention("fail", r"^fail$"),
                RuleSpec::mention("refuse", r"^refuse$"),
                RuleSpec::mention("panic", r"^panic$"),
                RuleSpec::mention("slow", r"^slow$"),
                RuleSpec::listen("towel", r"you're a towel").help("towels"),
            ]
        }

        async fn handle(
            &self,
            action: &str,
            _msg: &IncomingMessage,
            caps: &Captures,
        ) -> Result<Vec<Reply>> {
            match action {
                "echo" => Ok(vec![Reply::Say(caps.get("what").unwrap_or("").to_string())]),
                "fail" => Err(Error::Store("disk on fire".into())),
                "refuse" => Err(Error::PreconditionFailed("nope".into())),
                "panic" => panic!("boom"),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(vec![Reply::Say("late".into())])
                }
                _ => Ok(vec![Reply::Reply("YOU'RE a towel!".into())]),
            }
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut reg = Registry::new();
        reg.register(Arc::new(Towelie)).unwrap();
        Dispatcher::new(Arc::new(reg), Arc::new(Roster::new()))
            .with_handler_timeout(Duration::from_millis(50))
    }

    fn msg(text: &str, addressed: bool) -> IncomingMessage {
        IncomingMessage {
            message: MessageRef {
                chat_id: ChatId(-1),
                message_id: MessageId(1),
            },
            sender: Sender {
                user_id: UserId(9),
                username: Some("dave".into()),
            },
            text: if addressed {
                format!("@bot {text}")
            } else {
                text.to_string()
            },
            addressed: addressed.then(|| text.to_string()),
        }
    }

    #[tokio::test]
    async fn mention_rules_need_addressing() {
        let d = dispatcher();
        assert_eq!(
            d.dispatch(&msg("echo hi", true)).await,
            vec![Reply::Say("hi".into())]
        );
        assert!(d.dispatch(&msg("echo hi", false)).await.is_empty());
    }

    #[tokio::test]
    async fn unmatched_mention_gets_default_reply() {
        let d = dispatcher();
        assert_eq!(
            d.dispatch(&msg("open the pod bay doors", true)).await,
            vec![Reply::Reply(DEFAULT_REPLY.into())]
        );
    }

    #[tokio::test]
    async fn listeners_fire_regardless_of_addressing() {
        let d = dispatcher();
        let expected = vec![Reply::Reply("YOU'RE a towel!".into())];
        assert_eq!(d.dispatch(&msg("you're a towel", false)).await, expected);
        assert_eq!(d.dispatch(&msg("you're a towel", true)).await, expected);
    }

    #[tokio::test]
    async fn handler_failures_are_contained() {
        let d = dispatcher();
        assert_eq!(
            d.dispatch(&msg("refuse", true)).await,
            vec![Reply::Reply("nope".into())]
        );
        assert_eq!(
            d.dispatch(&msg("fail", true)).await,
            vec![Reply::Reply(APOLOGY.into())]
        );
        assert!(d.dispatch(&msg("panic", true)).await.is_empty());
        assert!(d.dispatch(&msg("slow", true)).await.is_empty());

        // Still serving afterwards.
        assert_eq!(
            d.dispatch(&msg("echo ok", true)).await,
            vec![Reply::Say("ok".into())]
        );
    }

    #[tokio::test]
    async fn help_is_sent_directly() {
        let d = dispatcher();
        let replies = d.dispatch(&msg("HALP", true)).await;
        assert_eq!(replies.len(), 1);
        match &replies[0] {
            Reply::Direct(text) => {
                assert!(text.contains("towelie.echo: echo things"));
                assert!(text.contains("towelie.towel: towels"));
            }
            other => panic!("expected direct reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn senders_are_recorded_in_roster() {
        let d = dispatcher();
        d.dispatch(&msg("just chatting", false)).await;
        assert!(d.roster().contains(ChatId(-1), "dave").await);
    }
}
