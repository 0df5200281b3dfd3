/// Chat platform user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Chat id (numeric). Private chats share the id of the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Message id within a chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Who sent an inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub user_id: UserId,
    pub username: Option<String>,
}

impl Sender {
    /// Opaque person id used by the stores: lowercased username, else the numeric id.
    pub fn person_id(&self) -> String {
        match &self.username {
            Some(u) if !u.trim().is_empty() => normalize_nick(u),
            _ => self.user_id.0.to_string(),
        }
    }

    /// Nickname as shown in replies.
    pub fn nick(&self) -> String {
        self.person_id()
    }
}

/// Strip a leading `@` and lowercase.
pub fn normalize_nick(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_lowercase()
}

/// Transport-neutral inbound chat message.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub message: MessageRef,
    pub sender: Sender,
    /// Full message text as typed.
    pub text: String,
    /// Text with the bot mention stripped, present only when the bot was addressed.
    pub addressed: Option<String>,
}

impl IncomingMessage {
    pub fn chat_id(&self) -> ChatId {
        self.message.chat_id
    }

    pub fn is_addressed(&self) -> bool {
        self.addressed.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_id_prefers_username() {
        let s = Sender {
            user_id: UserId(42),
            username: Some("@Alice".into()),
        };
        assert_eq!(s.person_id(), "alice");

        let anon = Sender {
            user_id: UserId(42),
            username: None,
        };
        assert_eq!(anon.person_id(), "42");
    }
}
