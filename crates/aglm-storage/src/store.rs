use std::sync::Once;

use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};

use aglm_contracts::TaskStatus;

use crate::error::StoreError;
use crate::models::{NewTask, TaskEventRow, TaskRow, TaskUpdate};

static INSTALL_DRIVERS: Once = Once::new();

/// Which relational backend `Store` is talking to. Only schema creation
/// branches on this; every other query is portable SQL shared by both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    Sqlite,
    MySql,
}

impl Driver {
    pub fn from_env_str(s: &str) -> Result<Self, StoreError> {
        match s {
            "sqlite" => Ok(Driver::Sqlite),
            "mysql" => Ok(Driver::MySql),
            other => Err(StoreError::Connection(format!(
                "unknown AGLM_DB_DRIVER: {other} (expected sqlite or mysql)"
            ))),
        }
    }
}

/// The tasks/task_events DAO. Every call is a short, self-contained
/// statement (or a two-statement update-then-insert upsert); callers treat
/// this as opaque async I/O.
#[derive(Clone)]
pub struct Store {
    pool: AnyPool,
    driver: Driver,
}

impl Store {
    pub async fn connect(driver: Driver, database_url: &str) -> Result<Self, StoreError> {
        INSTALL_DRIVERS.call_once(|| {
            sqlx::any::install_default_drivers();
        });

        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool, driver };
        store.init_schema().await?;
        Ok(store)
    }

    /// Idempotently create `tasks` and `task_events` plus the index on
    /// `task_events.task_id`. Auto-increment syntax is the one place this
    /// genuinely differs between sqlite and mysql.
    async fn init_schema(&self) -> Result<(), StoreError> {
        let tasks_ddl = "
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                task_user TEXT NOT NULL,
                task_type TEXT NOT NULL,
                status TEXT NOT NULL,
                redis_key TEXT NOT NULL,
                created_at REAL NOT NULL,
                updated_at REAL NOT NULL,
                last_checkpoint TEXT,
                resume_hint TEXT,
                retries INTEGER NOT NULL DEFAULT 0,
                payload_json TEXT NOT NULL,
                result_summary TEXT
            )";

        let task_events_ddl = match self.driver {
            Driver::Sqlite => {
                "CREATE TABLE IF NOT EXISTS task_events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    task_id TEXT NOT NULL,
                    phase TEXT NOT NULL,
                    status TEXT NOT NULL,
                    input TEXT,
                    output TEXT,
                    checkpoint_token TEXT,
                    created_at REAL NOT NULL
                )"
            }
            Driver::MySql => {
                "CREATE TABLE IF NOT EXISTS task_events (
                    id BIGINT AUTO_INCREMENT PRIMARY KEY,
                    task_id VARCHAR(255) NOT NULL,
                    phase VARCHAR(255) NOT NULL,
                    status VARCHAR(64) NOT NULL,
                    input TEXT,
                    output TEXT,
                    checkpoint_token TEXT,
                    created_at DOUBLE NOT NULL
                )"
            }
        };

        sqlx::query(tasks_ddl).execute(&self.pool).await?;
        sqlx::query(task_events_ddl).execute(&self.pool).await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_task_id ON task_events(task_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert-or-replace the durable row for `task_id`, preserving the
    /// existing `status` if a row is already present (invariant: a late
    /// intake write can never regress a worker's `running`/terminal update).
    pub async fn persist_task(&self, task: &NewTask) -> Result<(), StoreError> {
        let updated = sqlx::query(
            "UPDATE tasks SET task_user = ?, task_type = ?, redis_key = ?, \
             updated_at = ?, payload_json = ? WHERE id = ?",
        )
        .bind(&task.user)
        .bind(&task.task_type)
        .bind(&task.redis_key)
        .bind(task.now)
        .bind(&task.payload_json)
        .bind(&task.id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO tasks \
                 (id, task_user, task_type, status, redis_key, created_at, updated_at, retries, payload_json) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)",
            )
            .bind(&task.id)
            .bind(&task.user)
            .bind(&task.task_type)
            .bind(TaskStatus::Pending.to_string())
            .bind(&task.redis_key)
            .bind(task.now)
            .bind(task.now)
            .bind(&task.payload_json)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Update status and/or coalesce the optional result/resume_hint/checkpoint
    /// fields against the row's existing values.
    pub async fn update_task(
        &self,
        task_id: &str,
        update: &TaskUpdate,
        now: f64,
    ) -> Result<(), StoreError> {
        if let Some(status) = update.status {
            sqlx::query(
                "UPDATE tasks SET status = ?, updated_at = ?, \
                 result_summary = COALESCE(?, result_summary), \
                 resume_hint = COALESCE(?, resume_hint), \
                 last_checkpoint = COALESCE(?, last_checkpoint) \
                 WHERE id = ?",
            )
            .bind(status.to_string())
            .bind(now)
            .bind(update.result.as_deref())
            .bind(update.resume_hint.as_deref())
            .bind(update.checkpoint.as_deref())
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query(
                "UPDATE tasks SET updated_at = ?, \
                 result_summary = COALESCE(?, result_summary), \
                 resume_hint = COALESCE(?, resume_hint), \
                 last_checkpoint = COALESCE(?, last_checkpoint) \
                 WHERE id = ?",
            )
            .bind(now)
            .bind(update.result.as_deref())
            .bind(update.resume_hint.as_deref())
            .bind(update.checkpoint.as_deref())
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Append one row to `task_events`. `created_at` is taken from the caller
    /// rather than a database-side default so it shares the same clock the
    /// rest of the core uses for `now`.
    pub async fn record_event(
        &self,
        task_id: &str,
        phase: &str,
        status: &str,
        input: Option<&str>,
        output: Option<&str>,
        checkpoint_token: Option<&str>,
        now: f64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO task_events (task_id, phase, status, input, output, checkpoint_token, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(phase)
        .bind(status)
        .bind(input)
        .bind(output)
        .bind(checkpoint_token)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn load_task(&self, task_id: &str) -> Result<Option<TaskRow>, StoreError> {
        let row = sqlx::query(
            "SELECT id, task_user, task_type, status, redis_key, created_at, updated_at, \
             last_checkpoint, resume_hint, retries, payload_json, result_summary \
             FROM tasks WHERE id = ?",
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_task(&r)).transpose()
    }

    pub async fn query_events(
        &self,
        task_id: &str,
        limit: i64,
    ) -> Result<Vec<TaskEventRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, task_id, phase, status, input, output, checkpoint_token, created_at \
             FROM task_events WHERE task_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(task_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_event).collect()
    }
}

fn row_to_task(row: &AnyRow) -> Result<TaskRow, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<TaskStatus>()
        .map_err(|e| StoreError::Connection(format!("corrupt status column: {e}")))?;

    Ok(TaskRow {
        id: row.try_get("id")?,
        user: row.try_get("task_user")?,
        task_type: row.try_get("task_type")?,
        status,
        redis_key: row.try_get("redis_key")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        last_checkpoint: row.try_get("last_checkpoint")?,
        resume_hint: row.try_get("resume_hint")?,
        retries: row.try_get("retries")?,
        payload_json: row.try_get("payload_json")?,
        result_summary: row.try_get("result_summary")?,
    })
}

fn row_to_event(row: &AnyRow) -> Result<TaskEventRow, StoreError> {
    Ok(TaskEventRow {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        phase: row.try_get("phase")?,
        status: row.try_get("status")?,
        input: row.try_get("input")?,
        output: row.try_get("output")?,
        checkpoint_token: row.try_get("checkpoint_token")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> f64 {
        1_700_000_000.0
    }

    async fn memory_store() -> Store {
        Store::connect(Driver::Sqlite, "sqlite::memory:")
            .await
            .expect("in-memory sqlite store")
    }

    #[tokio::test]
    async fn persist_then_load_round_trips() {
        let store = memory_store().await;
        store
            .persist_task(&NewTask {
                id: "AGLM-TEST0001".into(),
                user: "alice".into(),
                task_type: "echo".into(),
                redis_key: "aglm:task:AGLM-TEST0001".into(),
                payload_json: "{}".into(),
                now: now(),
            })
            .await
            .unwrap();

        let row = store.load_task("AGLM-TEST0001").await.unwrap().unwrap();
        assert_eq!(row.user, "alice");
        assert_eq!(row.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn persist_twice_does_not_regress_status() {
        let store = memory_store().await;
        let task = NewTask {
            id: "AGLM-TEST0002".into(),
            user: "bob".into(),
            task_type: "echo".into(),
            redis_key: "aglm:task:AGLM-TEST0002".into(),
            payload_json: "{}".into(),
            now: now(),
        };
        store.persist_task(&task).await.unwrap();

        store
            .update_task(
                "AGLM-TEST0002",
                &TaskUpdate {
                    status: Some(TaskStatus::Running),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();

        // A second intake write for the same id (e.g. a retried HTTP call)
        // must not regress status back to pending.
        store.persist_task(&task).await.unwrap();

        let row = store.load_task("AGLM-TEST0002").await.unwrap().unwrap();
        assert_eq!(row.status, TaskStatus::Running);
    }

    #[tokio::test]
    async fn update_task_coalesces_optional_fields() {
        let store = memory_store().await;
        store
            .persist_task(&NewTask {
                id: "AGLM-TEST0003".into(),
                user: "carol".into(),
                task_type: "echo".into(),
                redis_key: "aglm:task:AGLM-TEST0003".into(),
                payload_json: "{}".into(),
                now: now(),
            })
            .await
            .unwrap();

        store
            .update_task(
                "AGLM-TEST0003",
                &TaskUpdate {
                    status: Some(TaskStatus::Running),
                    resume_hint: Some("checkpoint-1".into()),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();

        store
            .update_task(
                "AGLM-TEST0003",
                &TaskUpdate {
                    status: Some(TaskStatus::Success),
                    result: Some("done".into()),
                    ..Default::default()
                },
                now(),
            )
            .await
            .unwrap();

        let row = store.load_task("AGLM-TEST0003").await.unwrap().unwrap();
        assert_eq!(row.status, TaskStatus::Success);
        assert_eq!(row.result_summary.as_deref(), Some("done"));
        // resume_hint from the earlier call must survive the later coalesce.
        assert_eq!(row.resume_hint.as_deref(), Some("checkpoint-1"));
    }

    #[tokio::test]
    async fn record_event_then_query_events_orders_newest_first() {
        let store = memory_store().await;
        store
            .persist_task(&NewTask {
                id: "AGLM-TEST0004".into(),
                user: "dave".into(),
                task_type: "echo".into(),
                redis_key: "aglm:task:AGLM-TEST0004".into(),
                payload_json: "{}".into(),
                now: now(),
            })
            .await
            .unwrap();

        store
            .record_event("AGLM-TEST0004", "enqueue", "pending", Some("hi"), None, None, now())
            .await
            .unwrap();
        store
            .record_event("AGLM-TEST0004", "start", "running", Some("hi"), None, None, now())
            .await
            .unwrap();

        let events = store.query_events("AGLM-TEST0004", 20).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, "start");
        assert_eq!(events[1].phase, "enqueue");
    }

    #[test]
    fn driver_from_env_str_rejects_unknown() {
        assert!(Driver::from_env_str("postgres").is_err());
        assert_eq!(Driver::from_env_str("sqlite").unwrap(), Driver::Sqlite);
    }
}
