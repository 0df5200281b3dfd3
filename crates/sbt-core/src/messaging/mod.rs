//! Outbound messaging abstractions (Telegram today; other chat platforms later).

pub mod port;
pub mod throttled;
pub mod types;
