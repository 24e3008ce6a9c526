//! Embedded SQLite file backend.

use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use time::UtcDateTime;
use tracing::instrument;

use crate::backend::{ResourceRepository, validate_key, validate_put};
use crate::codec;
use crate::error::{ErrorKind, Result};
use crate::models::Record;

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Many concurrent renders read, a single build writes.
const MAX_CONNECTIONS: u32 = 5;

/// Repository stored in a single local SQLite file.
///
/// The `resources` table is created by an embedded migration on connect.
/// Writes read the stored payload first and only touch the row when the
/// encoded record differs.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    async fn new(options: SqliteConnectOptions, max: Option<u32>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Apply the query-based PRAGMAs to every pooled connection, not
            // only the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(max.unwrap_or(MAX_CONNECTIONS))
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Connection)?;
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    /// Open (creating if missing) the database file at `path` and run
    /// migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Opening resource database");
        let options = Self::base_options().filename(path).create_if_missing(true);
        Self::new(options, None).await
    }

    /// Connect to an in-memory database.
    ///
    /// Not gated behind `#[cfg(test)]` so that other crates can use it in
    /// their tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = Self::base_options().filename(":memory:");
        // Every in-memory connection is its own database, so keep just one.
        Self::new(options, Some(1)).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // A rebuild running while pages render holds the single writer
            // lock for the length of one transaction.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -4096;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing database migrations", skip_all)]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for pooled connections to be returned, then close them.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

#[async_trait]
impl ResourceRepository for SqliteRepository {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, theme: &str, name: &str) -> Result<Option<Record>> {
        validate_key(theme, name)?;
        let definition: Option<String> = sqlx::query_scalar(include_str!("../../queries/select_definition.sql"))
            .bind(name)
            .bind(theme)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        definition.as_deref().map(codec::decode).transpose()
    }

    #[instrument(skip_all, fields(theme = %theme, name = %name))]
    async fn put(&self, theme: &str, name: &str, record: &Record) -> Result<()> {
        validate_put(theme, name, record)?;
        let definition = codec::encode(record)?;
        let now = UtcDateTime::now().unix_timestamp();
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let stored: Option<String> = sqlx::query_scalar(include_str!("../../queries/select_definition.sql"))
            .bind(name)
            .bind(theme)
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        match stored {
            Some(stored) if stored == definition => {
                tracing::trace!("Stored definition is identical, nothing to write");
                return Ok(());
            },
            Some(_) => {
                sqlx::query(include_str!("../../queries/update_definition.sql"))
                    .bind(&definition)
                    .bind(now)
                    .bind(name)
                    .bind(theme)
                    .execute(&mut *tx)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            },
            None => {
                sqlx::query(include_str!("../../queries/insert_definition.sql"))
                    .bind(theme)
                    .bind(name)
                    .bind(&definition)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *tx)
                    .await
                    .or_raise(|| ErrorKind::Database)?;
            },
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)
    }

    async fn delete(&self, theme: &str, name: &str) -> Result<()> {
        validate_key(theme, name)?;
        sqlx::query(include_str!("../../queries/delete_definition.sql"))
            .bind(name)
            .bind(theme)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}
