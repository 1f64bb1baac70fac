//! SQLite persistence for targets.
//!
//! `target` holds one row per canonical URL. `target_transition` is an
//! append-only audit trail written in the same transaction as every insert
//! and status change; daily quotas are counted from it so a target that
//! moves on later the same day still counts once for the stage that moved it.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::{LifecycleStatus, Result, StoreError, TargetUrl};

const SCHEMA: [&str; 6] = [
    r#"CREATE TABLE IF NOT EXISTS target (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        url        TEXT    NOT NULL UNIQUE,
        status     TEXT    NOT NULL DEFAULT 'found'
                   CHECK (status IN ('found','invited','pending','already_connected','premium_only','messaged')),
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        CHECK (updated_at >= created_at)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_target_status ON target(status)",
    "CREATE INDEX IF NOT EXISTS idx_target_created ON target(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_target_updated ON target(updated_at)",
    r#"CREATE TABLE IF NOT EXISTS target_transition (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        target_id   INTEGER NOT NULL REFERENCES target(id),
        from_status TEXT,
        to_status   TEXT    NOT NULL,
        at          INTEGER NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_transition_to_at ON target_transition(to_status, at)",
];

/// Result of [`TargetStore::insert_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Queue ordering for [`TargetStore::select_oldest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOrder {
    /// First discovered first.
    Created,
    /// Least recently touched first.
    Updated,
}

impl SelectOrder {
    fn column(&self) -> &'static str {
        match self {
            SelectOrder::Created => "created_at",
            SelectOrder::Updated => "updated_at",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    pub url: TargetUrl,
    pub status: LifecycleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recorded status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecycleStatus,
    pub to: LifecycleStatus,
    pub at: DateTime<Utc>,
}

/// Per-status record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub by_status: BTreeMap<&'static str, u64>,
    pub total: u64,
}

impl StoreStats {
    pub fn get(&self, status: LifecycleStatus) -> u64 {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

#[derive(Clone)]
pub struct TargetStore {
    pool: SqlitePool,
}

impl TargetStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        info!(path = %path.display(), "store.open");
        Self::from_pool(pool).await
    }

    /// A private in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // The database lives only as long as its single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn insert_if_absent(&self, url: &TargetUrl) -> Result<InsertOutcome> {
        self.insert_if_absent_at(url, Utc::now()).await
    }

    /// Record `url` as `found` unless it is already known.
    pub async fn insert_if_absent_at(
        &self,
        url: &TargetUrl,
        at: DateTime<Utc>,
    ) -> Result<InsertOutcome> {
        let ms = at.timestamp_millis();
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            r#"INSERT INTO target (url, status, created_at, updated_at)
               VALUES (?1, 'found', ?2, ?2)
               ON CONFLICT(url) DO NOTHING"#,
        )
        .bind(url.as_str())
        .bind(ms)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            debug!(url = %url, "store.insert.duplicate");
            return Ok(InsertOutcome::Duplicate);
        }

        sqlx::query(
            r#"INSERT INTO target_transition (target_id, from_status, to_status, at)
               VALUES (?1, NULL, 'found', ?2)"#,
        )
        .bind(res.last_insert_rowid())
        .bind(ms)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        info!(url = %url, "store.insert");
        Ok(InsertOutcome::Inserted)
    }

    pub async fn exists(&self, url: &TargetUrl) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM target WHERE url = ?1")
            .bind(url.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn get(&self, url: &TargetUrl) -> Result<Option<TargetRecord>> {
        let row = sqlx::query(
            "SELECT url, status, created_at, updated_at FROM target WHERE url = ?1",
        )
        .bind(url.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    /// Up to `limit` records in any of `statuses`, oldest first by `order`.
    pub async fn select_oldest(
        &self,
        statuses: &[LifecycleStatus],
        order: SelectOrder,
        limit: u32,
    ) -> Result<Vec<TargetRecord>> {
        if statuses.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT url, status, created_at, updated_at FROM target \
             WHERE status IN ({placeholders}) ORDER BY {col} ASC, id ASC LIMIT ?",
            col = order.column()
        );
        let mut query = sqlx::query(&sql);
        for s in statuses {
            query = query.bind(s.as_str());
        }
        let rows = query.bind(i64::from(limit)).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    pub async fn update_status(&self, url: &TargetUrl, next: LifecycleStatus) -> Result<Transition> {
        self.update_status_at(url, next, Utc::now()).await
    }

    /// Move `url` to `next`, validating the transition and auditing it.
    ///
    /// The stored `updated_at` never precedes `created_at`, even if `at` does.
    pub async fn update_status_at(
        &self,
        url: &TargetUrl,
        next: LifecycleStatus,
        at: DateTime<Utc>,
    ) -> Result<Transition> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT id, status, created_at FROM target WHERE url = ?1")
            .bind(url.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;

        let id: i64 = row.try_get("id")?;
        let current: LifecycleStatus = row.try_get::<String, _>("status")?.parse()?;
        let created_at: i64 = row.try_get("created_at")?;

        if !current.can_become(next) {
            return Err(StoreError::IllegalTransition {
                url: url.to_string(),
                from: current,
                to: next,
            });
        }

        let ms = at.timestamp_millis().max(created_at);
        sqlx::query("UPDATE target SET status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(next.as_str())
            .bind(ms)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"INSERT INTO target_transition (target_id, from_status, to_status, at)
               VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(id)
        .bind(current.as_str())
        .bind(next.as_str())
        .bind(ms)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(url = %url, from = %current, to = %next, "store.update_status");
        Ok(Transition {
            from: current,
            to: next,
            at: millis_to_utc(ms),
        })
    }

    pub async fn count_by_status(&self, status: LifecycleStatus) -> Result<u64> {
        let n: i64 = sqlx::query("SELECT COUNT(*) AS n FROM target WHERE status = ?1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        Ok(n as u64)
    }

    pub async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64> {
        let n: i64 = sqlx::query("SELECT COUNT(*) AS n FROM target WHERE created_at >= ?1")
            .bind(since.timestamp_millis())
            .fetch_one(&self.pool)
            .await?
            .try_get("n")?;
        Ok(n as u64)
    }

    /// Records currently in `status` last touched at or after `since`.
    pub async fn count_updated_since(
        &self,
        status: LifecycleStatus,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        let n: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM target WHERE status = ?1 AND updated_at >= ?2",
        )
        .bind(status.as_str())
        .bind(since.timestamp_millis())
        .fetch_one(&self.pool)
        .await?
        .try_get("n")?;
        Ok(n as u64)
    }

    /// Transitions into `status` at or after `since`, whatever happened next.
    pub async fn count_transitions_since(
        &self,
        status: LifecycleStatus,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        let n: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM target_transition WHERE to_status = ?1 AND at >= ?2",
        )
        .bind(status.as_str())
        .bind(since.timestamp_millis())
        .fetch_one(&self.pool)
        .await?
        .try_get("n")?;
        Ok(n as u64)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM target GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        let mut stats = StoreStats::default();
        for status in LifecycleStatus::ALL {
            stats.by_status.insert(status.as_str(), 0);
        }
        for r in rows {
            let status: LifecycleStatus = r.try_get::<String, _>("status")?.parse()?;
            let n: i64 = r.try_get("n")?;
            stats.by_status.insert(status.as_str(), n as u64);
            stats.total += n as u64;
        }
        Ok(stats)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn record_from_row(r: &SqliteRow) -> Result<TargetRecord> {
    let url: String = r.try_get("url")?;
    Ok(TargetRecord {
        url: TargetUrl::parse(&url)?,
        status: r.try_get::<String, _>("status")?.parse()?,
        created_at: millis_to_utc(r.try_get("created_at")?),
        updated_at: millis_to_utc(r.try_get("updated_at")?),
    })
}

fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_default()
}
