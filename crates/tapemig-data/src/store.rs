//! PostgreSQL store backing the name lookup and the tape register.
//!
//! # Design
//! - Three operations only: bulk mapping fetch, single-row status fetch, status write.
//! - Table names come from validated configuration and are baked into the SQL once.
//! - Status writes update the existing row and insert one when the tape is unknown.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tapemig_core::{CoreError, CoreResult, MappingSource, TapeRegister, TapeStatus};
use tracing::{debug, info, warn};

use crate::error::{DataError, Result};

/// Table names used by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    /// `agid_name_src → agid_name_dst` mapping table.
    pub mapping: String,
    /// `(tape_name, status)` register table.
    pub register: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            mapping: "mig_mapping".to_string(),
            register: "mig_taperegister".to_string(),
        }
    }
}

#[derive(Debug)]
struct Statements {
    select_mappings: String,
    select_status: String,
    upsert_status: String,
}

impl Statements {
    fn new(tables: &TableNames) -> Self {
        Self {
            select_mappings: format!(
                "SELECT agid_name_src, agid_name_dst FROM {}",
                tables.mapping
            ),
            select_status: format!(
                "SELECT status FROM {} WHERE tape_name = $1",
                tables.register
            ),
            upsert_status: format!(
                "INSERT INTO {} (tape_name, status) VALUES ($1, $2) \
                 ON CONFLICT (tape_name) DO UPDATE \
                 SET status = EXCLUDED.status, updated_at = now()",
                tables.register
            ),
        }
    }
}

/// Database-backed store for mappings and tape statuses.
#[derive(Clone)]
pub struct MigrationStore {
    pool: PgPool,
    statements: Arc<Statements>,
}

/// Apply the bundled schema migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|source| DataError::MigrationFailed { source })?;
    info!("migration schema is up to date");
    Ok(())
}

impl MigrationStore {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool, tables: &TableNames) -> Self {
        Self {
            pool,
            statements: Arc::new(Statements::new(tables)),
        }
    }

    /// Open a pool against `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable.
    pub async fn connect(url: &str, max_connections: u32, tables: &TableNames) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(DataError::query("connect"))?;
        Ok(Self::new(pool, tables))
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch the whole mapping table.
    ///
    /// Values are trimmed (fixed-width columns pad with spaces). A duplicated
    /// source key keeps its first destination and is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn fetch_name_mappings(&self) -> Result<HashMap<String, String>> {
        let rows: Vec<(String, String)> = sqlx::query_as(&self.statements.select_mappings)
            .fetch_all(&self.pool)
            .await
            .map_err(DataError::query("fetch_name_mappings"))?;

        let mut mappings = HashMap::with_capacity(rows.len());
        for (src, dst) in rows {
            let src = src.trim().to_string();
            let dst = dst.trim().to_string();
            if let Some(existing) = mappings.get(&src) {
                warn!(source_id = %src, kept = %existing, ignored = %dst, "duplicate name mapping");
                continue;
            }
            mappings.insert(src, dst);
        }
        debug!(count = mappings.len(), "loaded name mappings");
        Ok(mappings)
    }

    /// Fetch the recorded status of one tape.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored value is unknown.
    pub async fn fetch_tape_status(&self, tape: &str) -> Result<Option<TapeStatus>> {
        let row: Option<(String,)> = sqlx::query_as(&self.statements.select_status)
            .bind(tape)
            .fetch_optional(&self.pool)
            .await
            .map_err(DataError::query("fetch_tape_status"))?;

        row.map(|(value,)| {
            value.parse().map_err(|_| DataError::InvalidStatus {
                tape: tape.to_string(),
                value,
            })
        })
        .transpose()
    }

    /// Record `status` for `tape`, creating the row on first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn update_tape_status(&self, tape: &str, status: TapeStatus) -> Result<()> {
        sqlx::query(&self.statements.upsert_status)
            .bind(tape)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(DataError::query("update_tape_status"))?;
        debug!(tape = %tape, status = %status, "tape status recorded");
        Ok(())
    }
}

#[async_trait]
impl MappingSource for MigrationStore {
    async fn fetch_mappings(&self) -> CoreResult<HashMap<String, String>> {
        self.fetch_name_mappings()
            .await
            .map_err(|err| CoreError::store("fetch_name_mappings", err))
    }
}

#[async_trait]
impl TapeRegister for MigrationStore {
    async fn set_status(&self, tape: &str, status: TapeStatus) -> CoreResult<()> {
        self.update_tape_status(tape, status).await.map_err(|err| {
            warn!(tape = %tape, status = %status, error = %err, "failed to update tape status");
            CoreError::store("update_tape_status", err)
        })
    }
}
