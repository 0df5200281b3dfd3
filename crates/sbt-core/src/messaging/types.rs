/// What a handler wants sent back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Threaded reply to the sender in the originating chat.
    Reply(String),
    /// Plain message into the originating chat.
    Say(String),
    /// Private message to the sender.
    Direct(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Reply(t) | Reply::Say(t) | Reply::Direct(t) => t,
        }
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_html: bool,
    pub supports_direct: bool,
    pub max_message_len: usize,
}
