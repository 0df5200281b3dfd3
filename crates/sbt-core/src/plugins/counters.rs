use async_trait::async_trait;

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    errors::Error,
    messaging::types::Reply,
    numbers::NumberLiteral,
    store::{ArithOp, CounterStore},
    Result,
};

pub struct CountersPlugin {
    store: CounterStore,
}

impl CountersPlugin {
    pub fn new(store: CounterStore) -> Self {
        Self { store }
    }

    async fn step(&self, key: &str, op: &str) -> Result<String> {
        let key = key.to_lowercase();
        let delta = if op == "++" { 1 } else { -1 };

        let number = NumberLiteral::parse(&key);
        if number.is_number() {
            return Ok(number.offset(delta).render());
        }

        let n = if delta > 0 {
            self.store.increment(&key).await?
        } else {
            self.store.decrement(&key).await?
        };
        Ok(format!("{key} is now {n}"))
    }

    async fn arithmetic(&self, key: &str, op: &str, amount: &str) -> Result<String> {
        let key = key.to_lowercase();
        let op = ArithOp::from_symbol(op)
            .ok_or_else(|| Error::PreconditionFailed(format!("I don't know how to {op}=")))?;
        let amount: i64 = amount.parse().map_err(|_| Error::Overflow)?;
        let n = self.store.arithmetic(&key, op, amount).await?;
        Ok(format!("{key} is now {n}"))
    }

    async fn list(&self) -> Result<String> {
        let keys = self.store.list_keys().await?;
        if keys.is_empty() {
            return Ok("Could not find keys for counts!".to_string());
        }
        Ok(keys.join(", "))
    }
}

#[async_trait]
impl Plugin for CountersPlugin {
    fn name(&self) -> &'static str {
        "counters"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::listen("step", r"^(?P<key>[\w.-]+)(?P<op>\+\+|--)$")
                .requires(&["key", "op"])
                .help("count things. Example: beer++"),
            RuleSpec::listen(
                "arithmetic",
                r"^(?P<key>[\w.-]+)\s(?P<op>[+\-*/])=\s(?P<amount>-?\d+)$",
            )
            .requires(&["key", "op", "amount"])
            .help("adjust a count arithmetically. Examples: a += 3, stuff *= 0, things /= 2"),
            RuleSpec::mention("delete", r"^delete\s(?P<key>\w+)$")
                .requires(&["key"])
                .help("delete a counter whose count is 0. Example: delete beer"),
            RuleSpec::mention("print", r"^print\s(?P<key>\w+)$")
                .requires(&["key"])
                .help("show a count. Example: print beer"),
            RuleSpec::mention("list", r"^list\scounts").help("list things being counted"),
        ]
    }

    async fn handle(
        &self,
        action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let key = caps.get("key").unwrap_or_default();
        let text = match action {
            "step" => self.step(key, caps.get("op").unwrap_or("++")).await?,
            "arithmetic" => {
                self.arithmetic(
                    key,
                    caps.get("op").unwrap_or("+"),
                    caps.get("amount").unwrap_or("0"),
                )
                .await?
            }
            "delete" => {
                self.store.delete(key).await?;
                format!("{} has been deleted.", key.to_lowercase())
            }
            "print" => match self.store.get(key).await? {
                Some(n) => n.to_string(),
                None => "None".to_string(),
            },
            "list" => self.list().await?,
            _ => return Ok(Vec::new()),
        };
        Ok(vec![Reply::Reply(text)])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dispatch::{Dispatcher, Registry},
        domain::{ChatId, MessageId, MessageRef, Sender, UserId},
        roster::Roster,
        store::Db,
    };

    fn dispatcher() -> Dispatcher {
        let store = CounterStore::new(Db::open_in_memory().unwrap());
        let mut reg = Registry::new();
        reg.register(Arc::new(CountersPlugin::new(store))).unwrap();
        Dispatcher::new(Arc::new(reg), Arc::new(Roster::new()))
    }

    fn heard(text: &str) -> IncomingMessage {
        IncomingMessage {
            message: MessageRef {
                chat_id: ChatId(-5),
                message_id: MessageId(1),
            },
            sender: Sender {
                user_id: UserId(1),
                username: Some("amy".into()),
            },
            text: text.to_string(),
            addressed: None,
        }
    }

    fn addressed(text: &str) -> IncomingMessage {
        IncomingMessage {
            addressed: Some(text.to_string()),
            text: format!("@sbt {text}"),
            ..heard(text)
        }
    }

    async fn say(d: &Dispatcher, m: IncomingMessage) -> String {
        let replies = d.dispatch(&m).await;
        replies
            .iter()
            .map(|r| r.text().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn increment_decrement_delete_scenario() {
        let d = dispatcher();
        assert_eq!(say(&d, heard("a++")).await, "a is now 1");
        assert_eq!(say(&d, heard("a--")).await, "a is now 0");
        assert_eq!(say(&d, addressed("delete a")).await, "a has been deleted.");
        assert_eq!(
            say(&d, addressed("delete a")).await,
            "a does not exist in the Counts table or it does not have a count of 0!"
        );
    }

    #[tokio::test]
    async fn divide_by_zero_scenario() {
        let d = dispatcher();
        assert_eq!(say(&d, heard("stuff *= 0")).await, "stuff is now 0");
        assert_eq!(
            say(&d, heard("stuff /= 0")).await,
            "You can't divide by zero, stupid!"
        );
        assert_eq!(say(&d, addressed("print stuff")).await, "0");
    }

    #[tokio::test]
    async fn keys_are_case_insensitive() {
        let d = dispatcher();
        say(&d, heard("Beer++")).await;
        assert_eq!(say(&d, heard("BEER += 4")).await, "beer is now 5");
        assert_eq!(say(&d, addressed("print BeEr")).await, "5");
    }

    #[tokio::test]
    async fn number_shaped_keys_are_not_stored() {
        let d = dispatcher();
        assert_eq!(say(&d, heard("0x1f++")).await, "0x20");
        assert_eq!(say(&d, heard("0b101--")).await, "0b100");
        assert_eq!(say(&d, heard("41++")).await, "42");
        assert_eq!(say(&d, heard("1.5++")).await, "2.5");
        assert_eq!(
            say(&d, addressed("list counts")).await,
            "Could not find keys for counts!"
        );
    }

    #[tokio::test]
    async fn print_and_list() {
        let d = dispatcher();
        assert_eq!(say(&d, addressed("print nothing")).await, "None");
        say(&d, heard("x++")).await;
        say(&d, heard("y--")).await;
        let listed = say(&d, addressed("list counts")).await;
        let mut keys: Vec<&str> = listed.split(", ").collect();
        keys.sort();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn counter_commands_inside_sentences_are_ignored() {
        let d = dispatcher();
        assert!(d.dispatch(&heard("I said a++ yesterday")).await.is_empty());
    }
}
