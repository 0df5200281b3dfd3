use chrono::NaiveDate;
use rusqlite::params;

use crate::{domain::normalize_nick, store::Db, Result};

/// Per-nick, per-day snort tallies.
#[derive(Clone)]
pub struct SnortStore {
    db: Db,
}

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

impl SnortStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Add one snort for `nick` on `day` and return the new total for that day.
    pub async fn record(&self, nick: &str, day: NaiveDate) -> Result<i64> {
        let nick = normalize_nick(nick);
        let day = day_key(day);
        self.db
            .write(move |tx| {
                tx.execute(
                    "INSERT INTO snorts (nick, day, count) VALUES (?1, ?2, 1)
                     ON CONFLICT (nick, day) DO UPDATE SET count = count + 1",
                    params![nick, day],
                )?;
                let n: i64 = tx.query_row(
                    "SELECT count FROM snorts WHERE nick = ?1 AND day = ?2",
                    params![nick, day],
                    |r| r.get(0),
                )?;
                Ok(n)
            })
            .await
    }

    /// Everyone who snorted on `day`, most snorts first.
    pub async fn today(&self, day: NaiveDate) -> Result<Vec<(String, i64)>> {
        let day = day_key(day);
        self.db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT nick, count FROM snorts WHERE day = ?1 ORDER BY count DESC, nick ASC",
                )?;
                let rows = stmt
                    .query_map(params![day], |r| Ok((r.get(0)?, r.get(1)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}
