//! SQLite persistence for counters, snorts and endorsements.
//!
//! ## Tables
//!
//! - `counts` - named counters (`key` unique)
//! - `snorts` - per-nick, per-day snort counts
//! - `person`, `skill` - get-or-create normalization tables
//! - `endorsement` - (endorser, endorsee, skill) triples, unique
//!
//! A single [`Db`] is opened at startup and handed to each store. Every operation
//! acquires the connection on tokio's blocking pool, runs inside its own transaction and
//! releases the connection again. Writes that miss the call deadline are rolled back.

pub mod counters;
pub mod endorsements;
pub mod schema;
pub mod snorts;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, error, info, warn};

use crate::{errors::Error, Result};

pub use counters::{ArithOp, CounterStore};
pub use endorsements::{EndorsementStore, EndorsementSummary};
pub use snorts::SnortStore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const COMMIT_GRACE: Duration = Duration::from_secs(1);

/// Shared handle to the bot database.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl Db {
    /// Open or create the database file and make sure the schema exists.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        info!("Opening SQLite database at {}", path.display());

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        // Lock waits give up well before the call deadline so the error can surface.
        conn.busy_timeout(timeout / 2)?;

        Self::from_connection(conn, timeout)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory SQLite database");
        Self::from_connection(Connection::open_in_memory()?, DEFAULT_TIMEOUT)
    }

    /// Wrap an already-open connection.
    pub fn from_connection(conn: Connection, timeout: Duration) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::create_tables(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Run `f` against the connection with a bounded timeout.
    ///
    /// For reads and single statements. Anything that must commit atomically goes
    /// through [`Db::write`].
    pub async fn call<F, T>(&self, f: F) -> Result<T>
    where
        F: Fn(&mut Connection) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        self.run(move |conn, _deadline| f(conn)).await
    }

    /// Run `f` inside an IMMEDIATE transaction and commit it.
    ///
    /// The transaction commits only if `f` succeeds before the call deadline; otherwise
    /// it is rolled back and the caller gets [`Error::Timeout`]. A timed-out write is
    /// never persisted.
    pub async fn write<F, T>(&self, f: F) -> Result<T>
    where
        F: Fn(&Transaction<'_>) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let timeout = self.timeout;
        self.run(move |conn, deadline| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = f(&tx)?;
            if Instant::now() >= deadline {
                warn!("rolling back storage write that missed its deadline");
                return Err(deadline_error(timeout));
            }
            tx.commit()?;
            Ok(out)
        })
        .await
    }

    /// Transient failures (busy/locked database) are retried once before surfacing.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: Fn(&mut Connection, Instant) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let f = Arc::new(f);
        match self.run_once(f.clone()).await {
            Err(e) if e.is_transient() => {
                warn!("retrying storage call after transient failure: {e}");
                self.run_once(f).await
            }
            other => other,
        }
    }

    async fn run_once<F, T>(&self, f: Arc<F>) -> Result<T>
    where
        F: Fn(&mut Connection, Instant) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        let timeout = self.timeout;
        let deadline = Instant::now() + timeout;
        let task = tokio::task::spawn_blocking(move || {
            // A panic inside `f` has already rolled its transaction back while unwinding.
            let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if Instant::now() >= deadline {
                return Err(deadline_error(timeout));
            }
            f(&mut guard, deadline)
        });

        // The task enforces the deadline itself; this only guards against a wedged thread.
        match tokio::time::timeout(timeout + COMMIT_GRACE, task).await {
            Ok(Ok(res)) => res,
            Ok(Err(join)) => Err(Error::Store(format!("storage task failed: {join}"))),
            Err(_) => {
                error!(
                    "storage call still running {}ms past its deadline",
                    COMMIT_GRACE.as_millis()
                );
                Err(deadline_error(timeout))
            }
        }
    }

    /// Drop every bot table. Maintenance only.
    pub async fn drop_tables(&self) -> Result<()> {
        self.write(|tx| schema::drop_tables(tx)).await
    }

    /// Re-run idempotent table creation.
    pub async fn create_tables(&self) -> Result<()> {
        self.write(|tx| schema::create_tables(tx)).await
    }
}

fn deadline_error(timeout: Duration) -> Error {
    Error::Timeout(format!("storage call exceeded {}ms", timeout.as_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn transient_errors_are_retried_once() {
        let db = Db::open_in_memory().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();

        let out = db
            .call(move |_conn| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(Error::TransientStore("database is locked".into()));
                }
                Ok(7)
            })
            .await
            .unwrap();

        assert_eq!(out, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_transient_errors_surface_after_retry() {
        let db = Db::open_in_memory().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();

        let err = db
            .call(move |_conn| -> Result<()> {
                seen.fetch_add(1, Ordering::SeqCst);
                Err(Error::TransientStore("database is locked".into()))
            })
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn table_creation_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        db.create_tables().await.unwrap();
        db.create_tables().await.unwrap();
        db.drop_tables().await.unwrap();
        db.create_tables().await.unwrap();
    }

    #[tokio::test]
    async fn writes_past_the_deadline_are_rolled_back() {
        let conn = Connection::open_in_memory().unwrap();
        let db = Db::from_connection(conn, Duration::from_millis(50)).unwrap();

        let err = db
            .write(|tx| {
                tx.execute("INSERT INTO counts (key, count) VALUES ('late', 1)", [])?;
                std::thread::sleep(Duration::from_millis(150));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "{err:?}");

        let rows: i64 = db
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM counts WHERE key = 'late'", [], |r| {
                    r.get(0)
                })?)
            })
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn writes_within_the_deadline_commit() {
        let db = Db::open_in_memory().unwrap();
        db.write(|tx| {
            tx.execute("INSERT INTO counts (key, count) VALUES ('quick', 3)", [])?;
            Ok(())
        })
        .await
        .unwrap();

        let n: i64 = db
            .call(|conn| {
                Ok(conn.query_row("SELECT count FROM counts WHERE key = 'quick'", [], |r| {
                    r.get(0)
                })?)
            })
            .await
            .unwrap();
        assert_eq!(n, 3);
    }
}
