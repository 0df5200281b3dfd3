use rusqlite::{params, ErrorCode, Transaction};
use tracing::error;

use crate::{errors::Error, store::Db, Result};

const DUPLICATE: &str = "Cannot endorse twice!";
const FAILED: &str = "Something went wrong while trying endorse. Sorry! Try again!";

/// Skill counts for one endorsee, skills in alphabetical order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndorsementSummary {
    pub endorsee: String,
    pub skills: Vec<(String, i64)>,
}

#[derive(Clone)]
pub struct EndorsementStore {
    db: Db,
}

fn get_or_create(tx: &Transaction<'_>, table: &str, column: &str, value: &str) -> Result<i64> {
    tx.execute(
        &format!("INSERT OR IGNORE INTO {table} ({column}) VALUES (?1)"),
        params![value],
    )?;
    let id = tx.query_row(
        &format!("SELECT id FROM {table} WHERE {column} = ?1"),
        params![value],
        |r| r.get(0),
    )?;
    Ok(id)
}

impl EndorsementStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Record that `endorser` vouches for `endorsee` on `skill`.
    ///
    /// Each (endorser, endorsee, skill) triple can exist once; a repeat fails with
    /// [`Error::AlreadyExists`] and leaves no new rows behind.
    pub async fn endorse(&self, endorser: &str, endorsee: &str, skill: &str) -> Result<()> {
        let (endorser, endorsee, skill) =
            (endorser.to_string(), endorsee.to_string(), skill.to_string());

        let res = self
            .db
            .write(move |tx| {
                let endorser_id = get_or_create(tx, "person", "platform_id", &endorser)?;
                let endorsee_id = get_or_create(tx, "person", "platform_id", &endorsee)?;
                let skill_id = get_or_create(tx, "skill", "key", &skill)?;

                match tx.execute(
                    "INSERT INTO endorsement (endorser_id, endorsee_id, skill_id)
                     VALUES (?1, ?2, ?3)",
                    params![endorser_id, endorsee_id, skill_id],
                ) {
                    Err(rusqlite::Error::SqliteFailure(f, _))
                        if f.code == ErrorCode::ConstraintViolation =>
                    {
                        return Err(Error::AlreadyExists(DUPLICATE.to_string()));
                    }
                    other => {
                        other?;
                    }
                }
                Ok(())
            })
            .await;

        match res {
            Err(Error::AlreadyExists(msg)) => Err(Error::AlreadyExists(msg)),
            Err(e) => {
                error!("endorsement failed: {e}");
                Err(Error::Endorsement(FAILED.to_string()))
            }
            Ok(()) => Ok(()),
        }
    }

    /// Endorsement counts grouped by endorsee then skill, optionally for one endorsee.
    pub async fn list_endorsements(
        &self,
        endorsee: Option<&str>,
    ) -> Result<Vec<EndorsementSummary>> {
        let filter = endorsee.map(str::to_string);
        let rows: Vec<(String, String, i64)> = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT p.platform_id, s.key, COUNT(*)
                     FROM endorsement e
                     JOIN person p ON p.id = e.endorsee_id
                     JOIN skill s ON s.id = e.skill_id
                     WHERE ?1 IS NULL OR p.platform_id = ?1
                     GROUP BY p.platform_id, s.key
                     ORDER BY p.platform_id, s.key",
                )?;
                let rows = stmt
                    .query_map(params![filter], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut out: Vec<EndorsementSummary> = Vec::new();
        for (endorsee, skill, n) in rows {
            match out.last_mut() {
                Some(last) if last.endorsee == endorsee => last.skills.push((skill, n)),
                _ => out.push(EndorsementSummary {
                    endorsee,
                    skills: vec![(skill, n)],
                }),
            }
        }
        Ok(out)
    }

    /// Everyone with at least one "vaccinated" endorsement.
    pub async fn list_vaccinated(&self) -> Result<Vec<String>> {
        self.db
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT p.platform_id
                     FROM endorsement e
                     JOIN person p ON p.id = e.endorsee_id
                     JOIN skill s ON s.id = e.skill_id
                     WHERE s.key = 'vaccinated'
                     ORDER BY p.platform_id",
                )?;
                let rows = stmt
                    .query_map([], |r| r.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }
}
