//! SQLite mirror database: tasks, members, and the score fold.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use taskpulse_core::error::{Error, Result};
use taskpulse_core::types::{MemberRecord, NotifyKind, TaskRecord};

/// Attempts for the fold transaction before surfacing a scoring conflict.
const FOLD_RETRIES: u32 = 3;

/// The local mirror database.
pub struct MirrorDb {
    conn: Mutex<Connection>,
}

impl MirrorDb {
    /// Open or create the mirror database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| Error::Store(format!("DB open: {e}")))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| Error::Store(format!("busy_timeout: {e}")))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            "
            -- Mirrored board cards
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id TEXT UNIQUE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                deadline TEXT,
                member_id TEXT,
                full_name TEXT,
                username TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_on TEXT,
                score_override REAL,
                score_counted INTEGER NOT NULL DEFAULT 0,
                assignment_notified INTEGER NOT NULL DEFAULT 0,
                overdue_notified INTEGER NOT NULL DEFAULT 0,
                escalation_notified INTEGER NOT NULL DEFAULT 0,
                completion_notified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Assignees with their running score aggregate
            CREATE TABLE IF NOT EXISTS members (
                member_id TEXT PRIMARY KEY,
                email TEXT NOT NULL DEFAULT '',
                full_name TEXT NOT NULL DEFAULT '',
                username TEXT NOT NULL DEFAULT '',
                historical_score REAL,
                total_tasks_counted INTEGER NOT NULL DEFAULT 0
            );
            ",
        )
        .map_err(|e| Error::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|p| p.into_inner())
    }

    // ─── Tasks ──────────────────────────────────────

    /// Upsert a task from an external card snapshot. Title, description and
    /// deadline always take the external values. Returns (task id, created).
    pub fn upsert_snapshot(
        &self,
        card_id: &str,
        title: &str,
        description: &str,
        deadline: Option<DateTime<Utc>>,
    ) -> Result<(i64, bool)> {
        let conn = self.lock();
        let now = fmt_ts(Utc::now());
        let deadline_str = deadline.map(fmt_ts);

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM tasks WHERE card_id = ?1",
                [card_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| Error::Store(format!("Lookup task: {e}")))?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE tasks SET title = ?1, description = ?2, deadline = ?3, updated_at = ?4
                     WHERE id = ?5",
                    params![title, description, deadline_str, now, id],
                )
                .map_err(|e| Error::Store(format!("Update task: {e}")))?;
                Ok((id, false))
            }
            None => {
                conn.execute(
                    "INSERT INTO tasks (card_id, title, description, deadline, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![card_id, title, description, deadline_str, now],
                )
                .map_err(|e| Error::Store(format!("Insert task: {e}")))?;
                Ok((conn.last_insert_rowid(), true))
            }
        }
    }

    /// Fetch one task by local id.
    pub fn get(&self, task_id: i64) -> Result<Option<TaskRecord>> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            [task_id],
            task_from_row,
        )
        .optional()
        .map_err(|e| Error::Store(format!("Get task: {e}")))
    }

    /// Fetch one task by external card id.
    pub fn get_by_card(&self, card_id: &str) -> Result<Option<TaskRecord>> {
        let conn = self.lock();
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE card_id = ?1"),
            [card_id],
            task_from_row,
        )
        .optional()
        .map_err(|e| Error::Store(format!("Get task by card: {e}")))
    }

    /// All tasks, oldest first.
    pub fn list_all(&self) -> Result<Vec<TaskRecord>> {
        self.query_tasks("1 = 1", params![])
    }

    /// Record a completion-state transition. `completed_on` must be present
    /// iff `completed` is true.
    pub fn set_completion(
        &self,
        task_id: i64,
        completed: bool,
        completed_on: Option<NaiveDate>,
    ) -> Result<()> {
        debug_assert_eq!(completed, completed_on.is_some());
        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET completed = ?1, completed_on = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                completed as i32,
                completed_on.map(|d| d.format("%Y-%m-%d").to_string()),
                fmt_ts(Utc::now()),
                task_id
            ],
        )
        .map_err(|e| Error::Store(format!("Set completion: {e}")))?;
        Ok(())
    }

    /// Cache the assignee on a task. Name fields may be absent when member
    /// enrichment failed; the raw id is still stored.
    pub fn set_assignment(
        &self,
        task_id: i64,
        member_id: &str,
        full_name: Option<&str>,
        username: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET member_id = ?1, full_name = ?2, username = ?3, updated_at = ?4
             WHERE id = ?5",
            params![member_id, full_name, username, fmt_ts(Utc::now()), task_id],
        )
        .map_err(|e| Error::Store(format!("Set assignment: {e}")))?;
        Ok(())
    }

    /// Clear the assignee on a task.
    pub fn clear_assignment(&self, task_id: i64) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET member_id = NULL, full_name = NULL, username = NULL, updated_at = ?1
             WHERE id = ?2",
            params![fmt_ts(Utc::now()), task_id],
        )
        .map_err(|e| Error::Store(format!("Clear assignment: {e}")))?;
        Ok(())
    }

    /// Delete every synced task whose card id is absent from the latest
    /// snapshot set. Tasks not yet pushed to the board (null card id) are
    /// kept. Returns the number of deleted rows.
    pub fn delete_missing(&self, seen: &HashSet<String>) -> Result<usize> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare("SELECT id, card_id FROM tasks WHERE card_id IS NOT NULL")
            .map_err(|e| Error::Store(format!("Prepare delete scan: {e}")))?;
        let stale: Vec<i64> = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| Error::Store(format!("Delete scan: {e}")))?
            .filter_map(|r| r.ok())
            .filter(|(_, card)| !seen.contains(card))
            .map(|(id, _)| id)
            .collect();

        for id in &stale {
            conn.execute("DELETE FROM tasks WHERE id = ?1", [id])
                .map_err(|e| Error::Store(format!("Delete task: {e}")))?;
        }
        Ok(stale.len())
    }

    /// Drop one task from the mirror by its card id.
    pub fn delete_by_card(&self, card_id: &str) -> Result<bool> {
        let conn = self.lock();
        let changed = conn
            .execute("DELETE FROM tasks WHERE card_id = ?1", [card_id])
            .map_err(|e| Error::Store(format!("Delete by card: {e}")))?;
        Ok(changed == 1)
    }

    /// Set or clear the manual score override. Any change resets
    /// `score_counted` so the new value is credited as a fresh fold.
    pub fn set_score_override(&self, task_id: i64, value: Option<f64>) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "UPDATE tasks SET score_override = ?1, score_counted = 0, updated_at = ?2
             WHERE id = ?3",
            params![value, fmt_ts(Utc::now()), task_id],
        )
        .map_err(|e| Error::Store(format!("Set override: {e}")))?;
        Ok(())
    }

    /// Flip one notification flag, only if currently unset. Returns whether
    /// this call won the flip. Callers send before flipping, so a `false`
    /// here means another pass already handled the condition.
    pub fn try_mark_notified(&self, task_id: i64, kind: NotifyKind) -> Result<bool> {
        let conn = self.lock();
        let col = kind.column();
        let changed = conn
            .execute(
                &format!(
                    "UPDATE tasks SET {col} = 1, updated_at = ?1 WHERE id = ?2 AND {col} = 0"
                ),
                params![fmt_ts(Utc::now()), task_id],
            )
            .map_err(|e| Error::Store(format!("Mark notified: {e}")))?;
        Ok(changed == 1)
    }

    // ─── Notification scans ──────────────────────────────────────

    /// Open tasks with an assignee that have not had the assignment notice.
    pub fn assignment_candidates(&self) -> Result<Vec<TaskRecord>> {
        self.query_tasks(
            "completed = 0 AND assignment_notified = 0 AND member_id IS NOT NULL",
            params![],
        )
    }

    /// Open tasks past their deadline without an overdue notice.
    pub fn overdue_candidates(&self, now: DateTime<Utc>) -> Result<Vec<TaskRecord>> {
        self.query_tasks(
            "completed = 0 AND overdue_notified = 0 AND deadline IS NOT NULL AND deadline < ?1",
            params![fmt_ts(now)],
        )
    }

    /// Open tasks past the escalation cutoff (deadline + grace) without an
    /// escalation notice.
    pub fn escalation_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<TaskRecord>> {
        self.query_tasks(
            "completed = 0 AND escalation_notified = 0 AND deadline IS NOT NULL AND deadline < ?1",
            params![fmt_ts(cutoff)],
        )
    }

    /// Completed tasks whose completion notice has not gone out.
    pub fn completion_candidates(&self) -> Result<Vec<TaskRecord>> {
        self.query_tasks("completed = 1 AND completion_notified = 0", params![])
    }

    fn query_tasks(
        &self,
        filter: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<TaskRecord>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE {filter} ORDER BY id"
            ))
            .map_err(|e| Error::Store(format!("Prepare scan: {e}")))?;
        let rows = stmt
            .query_map(args, task_from_row)
            .map_err(|e| Error::Store(format!("Scan tasks: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Members ──────────────────────────────────────

    /// Upsert profile fields from the board, leaving email and the score
    /// aggregate untouched.
    pub fn upsert_member_profile(
        &self,
        member_id: &str,
        full_name: &str,
        username: &str,
    ) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO members (member_id, full_name, username) VALUES (?1, ?2, ?3)
             ON CONFLICT(member_id) DO UPDATE SET full_name = ?2, username = ?3",
            params![member_id, full_name, username],
        )
        .map_err(|e| Error::Store(format!("Upsert member: {e}")))?;
        Ok(())
    }

    /// Register the delivery address for a member.
    pub fn set_member_email(&self, member_id: &str, email: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO members (member_id, email) VALUES (?1, ?2)
             ON CONFLICT(member_id) DO UPDATE SET email = ?2",
            params![member_id, email],
        )
        .map_err(|e| Error::Store(format!("Set member email: {e}")))?;
        Ok(())
    }

    /// Fetch one member.
    pub fn get_member(&self, member_id: &str) -> Result<Option<MemberRecord>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT member_id, email, full_name, username, historical_score, total_tasks_counted
             FROM members WHERE member_id = ?1",
            [member_id],
            member_from_row,
        )
        .optional()
        .map_err(|e| Error::Store(format!("Get member: {e}")))
    }

    /// All members, by id.
    pub fn list_members(&self) -> Result<Vec<MemberRecord>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT member_id, email, full_name, username, historical_score, total_tasks_counted
                 FROM members ORDER BY member_id",
            )
            .map_err(|e| Error::Store(format!("Prepare members: {e}")))?;
        let rows = stmt
            .query_map([], member_from_row)
            .map_err(|e| Error::Store(format!("List members: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Score fold ──────────────────────────────────────

    /// Fold one task's score into its assignee's running mean.
    ///
    /// Runs in a single immediate transaction: claim `score_counted` with a
    /// conditional write, then update the member aggregate. The claim makes
    /// the fold at-most-once under concurrent passes; the transaction keeps
    /// the read-modify-write on the aggregate serialized. Returns whether
    /// this call performed the fold.
    pub fn credit_score(&self, task_id: i64, member_id: &str, score: f64) -> Result<bool> {
        let mut attempt = 0;
        loop {
            match self.credit_score_once(task_id, member_id, score) {
                Err(Error::ScoringRace(msg)) if attempt < FOLD_RETRIES => {
                    attempt += 1;
                    tracing::warn!("Fold conflict for member {member_id} (attempt {attempt}): {msg}");
                    std::thread::sleep(std::time::Duration::from_millis(50 * attempt as u64));
                }
                other => return other,
            }
        }
    }

    fn credit_score_once(&self, task_id: i64, member_id: &str, score: f64) -> Result<bool> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)
            .map_err(map_fold_err)?;

        // Claim the task. Zero rows means another pass already counted it.
        let claimed = tx
            .execute(
                "UPDATE tasks SET score_counted = 1, updated_at = ?1
                 WHERE id = ?2 AND score_counted = 0",
                params![fmt_ts(Utc::now()), task_id],
            )
            .map_err(map_fold_err)?;
        if claimed == 0 {
            return Ok(false);
        }

        // Member rows are created lazily on first fold.
        tx.execute(
            "INSERT OR IGNORE INTO members (member_id) VALUES (?1)",
            [member_id],
        )
        .map_err(map_fold_err)?;

        let (hist, count): (Option<f64>, i64) = tx
            .query_row(
                "SELECT historical_score, total_tasks_counted FROM members WHERE member_id = ?1",
                [member_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .map_err(map_fold_err)?;

        let (new_hist, new_count) = match hist {
            None => (score, 1),
            Some(h) => (round2((h * count as f64 + score) / (count + 1) as f64), count + 1),
        };

        tx.execute(
            "UPDATE members SET historical_score = ?1, total_tasks_counted = ?2
             WHERE member_id = ?3",
            params![new_hist, new_count, member_id],
        )
        .map_err(map_fold_err)?;

        tx.commit().map_err(map_fold_err)?;
        tracing::info!(
            "Folded score {score} for member {member_id}: mean {new_hist} over {new_count} task(s)"
        );
        Ok(true)
    }
}

const TASK_COLUMNS: &str = "id, card_id, title, description, deadline, member_id, full_name, \
     username, completed, completed_on, score_override, score_counted, assignment_notified, \
     overdue_notified, escalation_notified, completion_notified, created_at, updated_at";

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        card_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        deadline: row.get::<_, Option<String>>(4)?.and_then(|s| parse_ts(&s)),
        member_id: row.get(5)?,
        full_name: row.get(6)?,
        username: row.get(7)?,
        completed: row.get::<_, i32>(8)? != 0,
        completed_on: row
            .get::<_, Option<String>>(9)?
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        score_override: row.get(10)?,
        score_counted: row.get::<_, i32>(11)? != 0,
        assignment_notified: row.get::<_, i32>(12)? != 0,
        overdue_notified: row.get::<_, i32>(13)? != 0,
        escalation_notified: row.get::<_, i32>(14)? != 0,
        completion_notified: row.get::<_, i32>(15)? != 0,
        created_at: parse_ts(&row.get::<_, String>(16)?).unwrap_or_else(Utc::now),
        updated_at: parse_ts(&row.get::<_, String>(17)?).unwrap_or_else(Utc::now),
    })
}

fn member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MemberRecord> {
    Ok(MemberRecord {
        member_id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        username: row.get(3)?,
        historical_score: row.get(4)?,
        total_tasks_counted: row.get(5)?,
    })
}

/// Fixed-width UTC timestamp, safe for lexicographic comparison in SQL.
fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn map_fold_err(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::DatabaseBusy
                || err.code == rusqlite::ErrorCode::DatabaseLocked =>
        {
            Error::ScoringRace(e.to_string())
        }
        other => Error::Store(format!("Fold: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_db(name: &str) -> (MirrorDb, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("taskpulse-store-{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        (MirrorDb::open(&dir.join("mirror.db")).unwrap(), dir)
    }

    #[test]
    fn test_upsert_snapshot_create_then_update() {
        let (db, dir) = test_db("upsert");
        let due = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();

        let (id, created) = db.upsert_snapshot("card-1", "Ship it", "desc", Some(due)).unwrap();
        assert!(created);

        // Second pass with changed external fields overwrites them.
        let (id2, created2) = db.upsert_snapshot("card-1", "Ship it v2", "new", None).unwrap();
        assert_eq!(id, id2);
        assert!(!created2);

        let task = db.get_by_card("card-1").unwrap().unwrap();
        assert_eq!(task.title, "Ship it v2");
        assert_eq!(task.description, "new");
        assert!(task.deadline.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_completion_invariant_roundtrip() {
        let (db, dir) = test_db("completion");
        let (id, _) = db.upsert_snapshot("card-1", "t", "", None).unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        db.set_completion(id, true, Some(day)).unwrap();
        let task = db.get(id).unwrap().unwrap();
        assert!(task.completed);
        assert_eq!(task.completed_on, Some(day));

        db.set_completion(id, false, None).unwrap();
        let task = db.get(id).unwrap().unwrap();
        assert!(!task.completed);
        assert!(task.completed_on.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_delete_missing_keeps_seen_cards() {
        let (db, dir) = test_db("delete");
        db.upsert_snapshot("card-1", "a", "", None).unwrap();
        db.upsert_snapshot("card-2", "b", "", None).unwrap();
        db.upsert_snapshot("card-3", "c", "", None).unwrap();

        let seen: HashSet<String> = ["card-1", "card-3"].iter().map(|s| s.to_string()).collect();
        let deleted = db.delete_missing(&seen).unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get_by_card("card-2").unwrap().is_none());
        assert!(db.get_by_card("card-1").unwrap().is_some());
        assert!(db.get_by_card("card-3").unwrap().is_some());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_flag_flips_at_most_once() {
        let (db, dir) = test_db("flags");
        let (id, _) = db.upsert_snapshot("card-1", "t", "", None).unwrap();

        assert!(db.try_mark_notified(id, NotifyKind::Overdue).unwrap());
        assert!(!db.try_mark_notified(id, NotifyKind::Overdue).unwrap());
        // Flags are disjoint; another kind still flips.
        assert!(db.try_mark_notified(id, NotifyKind::Assignment).unwrap());

        let task = db.get(id).unwrap().unwrap();
        assert!(task.overdue_notified);
        assert!(task.assignment_notified);
        assert!(!task.escalation_notified);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fold_incremental_mean() {
        let (db, dir) = test_db("fold");
        let (t1, _) = db.upsert_snapshot("card-1", "a", "", None).unwrap();
        let (t2, _) = db.upsert_snapshot("card-2", "b", "", None).unwrap();

        assert!(db.credit_score(t1, "m-1", 8.5).unwrap());
        let m = db.get_member("m-1").unwrap().unwrap();
        assert_eq!(m.historical_score, Some(8.5));
        assert_eq!(m.total_tasks_counted, 1);

        assert!(db.credit_score(t2, "m-1", 10.0).unwrap());
        let m = db.get_member("m-1").unwrap().unwrap();
        assert_eq!(m.historical_score, Some(9.25));
        assert_eq!(m.total_tasks_counted, 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_fold_counts_each_task_once() {
        let (db, dir) = test_db("fold-once");
        let (t1, _) = db.upsert_snapshot("card-1", "a", "", None).unwrap();

        assert!(db.credit_score(t1, "m-1", 10.0).unwrap());
        // Re-crediting the same task is a no-op since the claim fails.
        assert!(!db.credit_score(t1, "m-1", 10.0).unwrap());

        let m = db.get_member("m-1").unwrap().unwrap();
        assert_eq!(m.total_tasks_counted, 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_concurrent_folds_lose_nothing() {
        let (db, dir) = test_db("fold-race");
        let (t1, _) = db.upsert_snapshot("card-1", "a", "", None).unwrap();
        let (t2, _) = db.upsert_snapshot("card-2", "b", "", None).unwrap();

        // Two completions for the same member land at the same time.
        std::thread::scope(|s| {
            let a = s.spawn(|| db.credit_score(t1, "m-1", 8.0).unwrap());
            let b = s.spawn(|| db.credit_score(t2, "m-1", 10.0).unwrap());
            assert!(a.join().unwrap());
            assert!(b.join().unwrap());
        });

        let m = db.get_member("m-1").unwrap().unwrap();
        assert_eq!(m.total_tasks_counted, 2);
        assert_eq!(m.historical_score, Some(9.0));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_override_resets_counted() {
        let (db, dir) = test_db("override");
        let (t1, _) = db.upsert_snapshot("card-1", "a", "", None).unwrap();
        assert!(db.credit_score(t1, "m-1", 10.0).unwrap());

        // Changing the override reopens the task for a fresh fold of the
        // new value; the prior contribution stays in the aggregate.
        db.set_score_override(t1, Some(5.0)).unwrap();
        let task = db.get(t1).unwrap().unwrap();
        assert!(!task.score_counted);
        assert_eq!(task.score_override, Some(5.0));

        assert!(db.credit_score(t1, "m-1", 5.0).unwrap());
        let m = db.get_member("m-1").unwrap().unwrap();
        assert_eq!(m.total_tasks_counted, 2);
        assert_eq!(m.historical_score, Some(7.5));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_member_profile_keeps_email_and_aggregate() {
        let (db, dir) = test_db("member");
        db.set_member_email("m-1", "dev@example.com").unwrap();
        let (t1, _) = db.upsert_snapshot("card-1", "a", "", None).unwrap();
        db.credit_score(t1, "m-1", 9.0).unwrap();

        db.upsert_member_profile("m-1", "Dev One", "devone").unwrap();
        let m = db.get_member("m-1").unwrap().unwrap();
        assert_eq!(m.email, "dev@example.com");
        assert_eq!(m.full_name, "Dev One");
        assert_eq!(m.historical_score, Some(9.0));
        std::fs::remove_dir_all(&dir).ok();
    }
}
