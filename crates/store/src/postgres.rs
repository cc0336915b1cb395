use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use copydesk_core::{Task, TaskId, TaskStatus, TenantId};

use crate::error::StoreError;
use crate::store::{ContentPatch, TaskStore, Transition};

/// Configuration for the `PostgreSQL` task store backend.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the `sqlx` connection pool.
    pub pool_size: u32,
    /// Database schema holding the tasks table.
    pub schema: String,
    /// Prefix applied to table names to avoid collisions.
    pub table_prefix: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::from("postgres://localhost:5432/copydesk"),
            pool_size: 5,
            schema: String::from("public"),
            table_prefix: String::from("copydesk_"),
        }
    }
}

impl PostgresConfig {
    /// Fully-qualified tasks table name (`schema.prefix_tasks`).
    pub(crate) fn tasks_table(&self) -> String {
        format!("{}.{}tasks", self.schema, self.table_prefix)
    }
}

/// `PostgreSQL`-backed implementation of [`TaskStore`].
///
/// The conditional transition is a single
/// `UPDATE ... WHERE id = $1 AND status = $2` so concurrent writers race on
/// the row itself rather than on a read-modify-write sequence.
pub struct PostgresTaskStore {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresTaskStore {
    /// Connect, create the pool, and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool cannot be created, or
    /// [`StoreError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        run_migrations(&pool, &config)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool, config })
    }

    fn row_to_task(row: &PgRow) -> Result<Task, StoreError> {
        let status_raw: String = row
            .try_get("status")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let status = TaskStatus::parse(&status_raw)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{status_raw}'")))?;

        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let tenant: String = row
            .try_get("tenant")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Task {
            id: TaskId::new(id),
            tenant: TenantId::new(tenant),
            brief: row
                .try_get("brief")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            tone: row
                .try_get("tone")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            audience: row
                .try_get("audience")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            platform: row
                .try_get("platform")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            status,
            content: row
                .try_get("content")
                .map_err(|e| StoreError::Backend(e.to_string()))?,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        let table = self.config.tasks_table();
        let insert = format!(
            "INSERT INTO {table}
                 (id, tenant, brief, tone, audience, platform, status, content, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );

        sqlx::query(&insert)
            .bind(task.id.as_str())
            .bind(task.tenant.as_str())
            .bind(&task.brief)
            .bind(&task.tone)
            .bind(&task.audience)
            .bind(&task.platform)
            .bind(task.status.as_str())
            .bind(&task.content)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(task)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let table = self.config.tasks_table();
        let select = format!("SELECT * FROM {table} WHERE id = $1");

        let row = sqlx::query(&select)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(|r| Self::row_to_task(&r)).transpose()
    }

    async fn transition(
        &self,
        id: &TaskId,
        expected: TaskStatus,
        next: TaskStatus,
        content: ContentPatch,
    ) -> Result<Transition, StoreError> {
        let table = self.config.tasks_table();

        let update = match content {
            ContentPatch::Keep => format!(
                "UPDATE {table} SET status = $3, updated_at = NOW()
                 WHERE id = $1 AND status = $2 RETURNING *"
            ),
            ContentPatch::Set(_) => format!(
                "UPDATE {table} SET status = $3, content = $4, updated_at = NOW()
                 WHERE id = $1 AND status = $2 RETURNING *"
            ),
            ContentPatch::Clear => format!(
                "UPDATE {table} SET status = $3, content = NULL, updated_at = NOW()
                 WHERE id = $1 AND status = $2 RETURNING *"
            ),
        };

        let mut query = sqlx::query(&update)
            .bind(id.as_str())
            .bind(expected.as_str())
            .bind(next.as_str());
        if let ContentPatch::Set(ref text) = content {
            query = query.bind(text);
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if let Some(row) = row {
            return Ok(Transition::Applied(Self::row_to_task(&row)?));
        }

        // The conditional write missed: either the row is gone or another
        // writer changed the status first.
        let probe = format!("SELECT status FROM {table} WHERE id = $1");
        let current = sqlx::query(&probe)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match current {
            None => Ok(Transition::NotFound),
            Some(row) => {
                let raw: String = row
                    .try_get("status")
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                let actual = TaskStatus::parse(&raw)
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown status '{raw}'")))?;
                Ok(Transition::Conflict { actual })
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

/// Create the tasks table if it does not exist.
async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let table = config.tasks_table();

    let create = format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            tenant TEXT NOT NULL,
            brief TEXT NOT NULL,
            tone TEXT,
            audience TEXT,
            platform TEXT,
            status TEXT NOT NULL,
            content TEXT,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )"
    );

    sqlx::query(&create).execute(pool).await?;
    Ok(())
}
