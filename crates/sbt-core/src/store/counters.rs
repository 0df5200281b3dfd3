//! Named counters (`a++`, `stuff *= 3`, `delete stuff`).

use rusqlite::{params, OptionalExtension};

use crate::{errors::Error, store::Db, Result};

/// Compound assignment operators understood by the counter commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
}

impl ArithOp {
    /// `"+"`, `"-"`, `"*"`, `"/"`.
    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::FloorDiv),
            _ => None,
        }
    }

    /// Division rounds toward negative infinity.
    pub fn apply(self, current: i64, operand: i64) -> Result<i64> {
        let out = match self {
            ArithOp::Add => current.checked_add(operand),
            ArithOp::Sub => current.checked_sub(operand),
            ArithOp::Mul => current.checked_mul(operand),
            ArithOp::FloorDiv => {
                if operand == 0 {
                    return Err(Error::DivisionByZero);
                }
                floor_div(current, operand)
            }
        };
        out.ok_or(Error::Overflow)
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Durable key → integer mapping.
#[derive(Clone)]
pub struct CounterStore {
    db: Db,
}

impl CounterStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn increment(&self, key: &str) -> Result<i64> {
        self.arithmetic(key, ArithOp::Add, 1).await
    }

    pub async fn decrement(&self, key: &str) -> Result<i64> {
        self.arithmetic(key, ArithOp::Sub, 1).await
    }

    /// Create-if-absent, apply `op`, persist; all in one transaction.
    ///
    /// On `DivisionByZero`/`Overflow` the transaction is rolled back, so the store is
    /// left exactly as it was (a fresh key is not created either).
    pub async fn arithmetic(&self, key: &str, op: ArithOp, operand: i64) -> Result<i64> {
        let key = normalize_key(key);
        self.db
            .write(move |tx| {
                tx.execute(
                    "INSERT OR IGNORE INTO counts (key, count) VALUES (?1, 0)",
                    params![key],
                )?;
                let current: i64 =
                    tx.query_row("SELECT count FROM counts WHERE key = ?1", params![key], |r| {
                        r.get(0)
                    })?;

                let next = op.apply(current, operand)?;

                tx.execute(
                    "UPDATE counts SET count = ?1 WHERE key = ?2",
                    params![next, key],
                )?;
                Ok(next)
            })
            .await
    }

    pub async fn get(&self, key: &str) -> Result<Option<i64>> {
        let key = normalize_key(key);
        self.db
            .call(move |conn| {
                Ok(conn
                    .query_row("SELECT count FROM counts WHERE key = ?1", params![key], |r| {
                        r.get(0)
                    })
                    .optional()?)
            })
            .await
    }

    /// Remove a counter whose count is exactly zero.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let key = normalize_key(key);
        self.db
            .write(move |tx| {
                let removed = tx.execute(
                    "DELETE FROM counts WHERE key = ?1 AND count = 0",
                    params![key],
                )?;
                if removed == 0 {
                    return Err(Error::PreconditionFailed(format!(
                        "{key} does not exist in the Counts table or it does not have a count of 0!"
                    )));
                }
                Ok(())
            })
            .await
    }

    /// All counter keys, in no particular order.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        self.db
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT key FROM counts")?;
                let keys = stmt
                    .query_map([], |r| r.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
    }
}
