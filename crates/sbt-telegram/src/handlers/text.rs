use teloxide::types::Message;

use sbt_core::domain::{ChatId, IncomingMessage, MessageId, MessageRef, Sender, UserId};

/// If `text` starts with one of `names` (optionally `@`-prefixed, any case), return the
/// rest of the message with the separator stripped.
pub fn strip_mention(text: &str, names: &[String]) -> Option<String> {
    let trimmed = text.trim_start();
    for name in names {
        let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
        let Some(head) = bare.get(..name.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(name) {
            continue;
        }
        let rest = &bare[name.len()..];
        match rest.chars().next() {
            None => return Some(String::new()),
            Some(c) if c.is_whitespace() || c == ':' || c == ',' => {
                let body =
                    rest.trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == ',');
                return Some(body.trim_end().to_string());
            }
            _ => continue,
        }
    }
    None
}

/// Transport-neutral view of a Telegram text message. `None` for anything without text
/// or without a sender.
pub fn incoming(msg: &Message, bot_names: &[String]) -> Option<IncomingMessage> {
    let text = msg.text()?;
    let user = msg.from()?;

    let addressed = match strip_mention(text, bot_names) {
        Some(body) => Some(body),
        None if msg.chat.is_private() => Some(text.trim().to_string()),
        None => None,
    };

    Some(IncomingMessage {
        message: MessageRef {
            chat_id: ChatId(msg.chat.id.0),
            message_id: MessageId(msg.id.0),
        },
        sender: Sender {
            user_id: UserId(user.id.0 as i64),
            username: user.username.clone(),
        },
        text: text.to_string(),
        addressed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["pdxbot".to_string(), "sbt".to_string()]
    }

    #[test]
    fn strips_leading_mentions() {
        assert_eq!(
            strip_mention("@pdxbot list counts", &names()).as_deref(),
            Some("list counts")
        );
        assert_eq!(
            strip_mention("SBT: print foo", &names()).as_deref(),
            Some("print foo")
        );
        assert_eq!(strip_mention("sbt,  hi!", &names()).as_deref(), Some("hi!"));
        assert_eq!(strip_mention("@pdxbot", &names()).as_deref(), Some(""));
    }

    #[test]
    fn ignores_other_text() {
        assert_eq!(strip_mention("sbtx hi", &names()), None);
        assert_eq!(strip_mention("hey sbt hi", &names()), None);
        assert_eq!(strip_mention("foo++", &names()), None);
        assert_eq!(strip_mention("sbt hi", &[]), None);
    }
}
