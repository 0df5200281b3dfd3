//! Gregorian → Covid calendar: every day since 2020-03-12 is still March 2020.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};

use crate::{
    dispatch::{Captures, Plugin, RuleSpec},
    domain::IncomingMessage,
    messaging::types::Reply,
    plugins::{local_today, Today},
    Result,
};

const EPOCH_YEAR: i32 = 2020;
const EPOCH_MONTH: u32 = 3;
const EPOCH_DAY: u32 = 12;

pub struct CovidPlugin {
    today: Today,
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(EPOCH_YEAR, EPOCH_MONTH, EPOCH_DAY).unwrap_or_default()
}

/// `YYYY-MM-DD`, `today`, `yesterday` or `tomorrow`.
pub fn parse_day(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    match raw.to_lowercase().as_str() {
        "today" => Some(today),
        "yesterday" => today.checked_sub_days(Days::new(1)),
        "tomorrow" => today.checked_add_days(Days::new(1)),
        _ => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok(),
    }
}

/// Days before the epoch count down from `2020-3-0` with a leading minus sign.
pub fn to_covid(date: NaiveDate) -> String {
    let epoch = epoch();
    let (sign, day) = if date < epoch {
        let back = (epoch - date).num_days() - 1;
        (if back > 0 { "-" } else { "" }, back)
    } else {
        ("", i64::from(EPOCH_DAY) + (date - epoch).num_days())
    };
    format!(
        "Gregorian {} is Covid date {sign}{EPOCH_YEAR}-{EPOCH_MONTH}-{day}",
        date.format("%F")
    )
}

impl CovidPlugin {
    pub fn new() -> Self {
        Self { today: local_today }
    }

    pub fn with_today(mut self, today: Today) -> Self {
        self.today = today;
        self
    }
}

impl Default for CovidPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for CovidPlugin {
    fn name(&self) -> &'static str {
        "covid"
    }

    fn rules(&self) -> Vec<RuleSpec> {
        vec![
            RuleSpec::listen("date", r"what day( of TYOOL 2020)? is (?P<date>.*)\?")
                .requires(&["date"])
                .help("transcribe a date to the Covid calendar. Example: what day of TYOOL 2020 is today?"),
        ]
    }

    async fn handle(
        &self,
        _action: &str,
        _msg: &IncomingMessage,
        caps: &Captures,
    ) -> Result<Vec<Reply>> {
        let raw = caps.get("date").unwrap_or_default();
        let text = match parse_day(raw, (self.today)()) {
            Some(day) => to_covid(day),
            None => format!("I don't know when {} is.", raw.trim()),
        };
        Ok(vec![Reply::Reply(text)])
    }
}
