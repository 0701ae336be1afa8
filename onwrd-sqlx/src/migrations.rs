//! Outbox 表结构迁移（MigrationAdapter）
//!
//! outbox 自身的迁移记录在独立的 `onwrd_migrations` 表中，不写入应用的
//! `_sqlx_migrations`，应用的 `Migrator` 因此不会遇到未知版本。
//!
//! 每个迁移步骤均可重复执行（`IF NOT EXISTS` 建表/建索引，加列前检查列是否存在），
//! 同一批待执行迁移在一个事务内完成，任一步骤失败整体回滚。
//!
use chrono::Utc;
use onwrd_domain::error::{OutboxError, OutboxResult};
use sqlx::migrate::Migrator;
use sqlx::{Connection, SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::fmt::Display;
use tracing::{debug, info};

/// outbox 表名
pub const OUTBOX_TABLE: &str = "onwrd_outbox";
/// outbox 迁移历史表名
pub const HISTORY_TABLE: &str = "onwrd_migrations";

enum Step {
    Sql(&'static str),
    AddColumn {
        column: &'static str,
        definition: &'static str,
    },
}

struct Migration {
    version: i64,
    description: &'static str,
    steps: &'static [Step],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create outbox table",
        steps: &[
            Step::Sql(
                "CREATE TABLE IF NOT EXISTS onwrd_outbox (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    event_type TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending'
                        CHECK (status IN ('pending', 'delivered')),
                    delivered_at TEXT
                )",
            ),
            Step::Sql(
                "CREATE INDEX IF NOT EXISTS idx_onwrd_outbox_status_id
                    ON onwrd_outbox (status, id)",
            ),
        ],
    },
    Migration {
        version: 2,
        description: "add claim and retry columns",
        steps: &[
            Step::AddColumn {
                column: "claimed_by",
                definition: "TEXT",
            },
            Step::AddColumn {
                column: "claimed_until",
                definition: "INTEGER",
            },
            Step::AddColumn {
                column: "attempts",
                definition: "INTEGER NOT NULL DEFAULT 0",
            },
            Step::AddColumn {
                column: "last_error",
                definition: "TEXT",
            },
        ],
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationAdapter;

impl MigrationAdapter {
    pub fn new() -> Self {
        Self
    }

    /// 最新的 outbox 迁移版本
    pub fn latest_version(&self) -> i64 {
        MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
    }

    /// 在给定连接上执行尚未应用的 outbox 迁移，返回本次应用的数量
    pub async fn run(&self, conn: &mut SqliteConnection) -> OutboxResult<usize> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS onwrd_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| migration_error(0, e))?;

        let applied: HashSet<i64> = Self::applied_versions(conn).await?.into_iter().collect();
        let pending: Vec<&Migration> = MIGRATIONS
            .iter()
            .filter(|m| !applied.contains(&m.version))
            .collect();

        if pending.is_empty() {
            debug!(version = self.latest_version(), "outbox schema up to date");
            return Ok(0);
        }

        info!(
            current_version = applied.iter().copied().max().unwrap_or(0),
            target_version = self.latest_version(),
            "running outbox migrations"
        );

        let mut tx = conn.begin().await.map_err(|e| migration_error(0, e))?;
        for m in &pending {
            for step in m.steps {
                apply_step(&mut tx, step)
                    .await
                    .map_err(|e| migration_error(m.version, e))?;
            }

            sqlx::query(
                "INSERT OR IGNORE INTO onwrd_migrations (version, description, applied_at)
                 VALUES (?, ?, ?)",
            )
            .bind(m.version)
            .bind(m.description)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| migration_error(m.version, e))?;

            debug!(version = m.version, description = m.description, "outbox migration applied");
        }
        tx.commit().await.map_err(|e| migration_error(0, e))?;

        info!(applied = pending.len(), "outbox migrations complete");
        Ok(pending.len())
    }

    /// 已记录的 outbox 迁移版本（升序）
    pub async fn applied_versions(conn: &mut SqliteConnection) -> OutboxResult<Vec<i64>> {
        sqlx::query_scalar("SELECT version FROM onwrd_migrations ORDER BY version")
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| migration_error(0, e))
    }

    /// 先执行 outbox 迁移，再执行应用自身的迁移，两者互不交错
    pub async fn migrate_with(&self, pool: &SqlitePool, app: &Migrator) -> OutboxResult<()> {
        {
            let mut conn = pool.acquire().await?;
            self.run(&mut conn).await?;
        }

        app.run(pool).await.map_err(|e| OutboxError::Migration {
            version: 0,
            reason: format!("application migrator: {e}"),
        })?;

        info!("application migrations complete");
        Ok(())
    }
}

async fn apply_step(conn: &mut SqliteConnection, step: &Step) -> Result<(), sqlx::Error> {
    match step {
        Step::Sql(sql) => {
            sqlx::query(sql).execute(&mut *conn).await?;
        }
        Step::AddColumn { column, definition } => {
            let exists: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
                    .bind(OUTBOX_TABLE)
                    .bind(*column)
                    .fetch_one(&mut *conn)
                    .await?;
            if exists == 0 {
                let sql = format!("ALTER TABLE {OUTBOX_TABLE} ADD COLUMN {column} {definition}");
                sqlx::query(&sql).execute(&mut *conn).await?;
            }
        }
    }
    Ok(())
}

fn migration_error(version: i64, err: impl Display) -> OutboxError {
    OutboxError::Migration {
        version,
        reason: err.to_string(),
    }
}
