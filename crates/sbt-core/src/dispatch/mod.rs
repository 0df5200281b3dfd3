//! Pattern registry and dispatcher.
//!
//! Plugins describe themselves with a table of [`RuleSpec`]s. The [`Registry`] compiles
//! them in registration order and the [`Dispatcher`] routes each inbound message:
//!
//! - addressed messages go to the first matching mention rule (or the built-in help, or
//!   the default reply)
//! - every message is offered to all listen rules
//!
//! Handlers never take the dispatcher down: errors are turned into text or logged,
//! panics and timeouts are logged and dropped.

mod dispatcher;
mod registry;

use async_trait::async_trait;

use crate::{domain::IncomingMessage, messaging::types::Reply, Result};

pub use dispatcher::{Dispatcher, APOLOGY};
pub use registry::{Captures, Mode, Registry, RuleSpec};

/// A bundle of related rules and the handler behind them.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn rules(&self) -> Vec<RuleSpec>;

    /// Run the rule named `action` for a message whose text matched it.
    async fn handle(
        &self,
        action: &str,
        msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>>;
}
