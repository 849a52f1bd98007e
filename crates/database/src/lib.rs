use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};

pub use deadpool_sqlite::rusqlite;

/// A pool of SQLite connections.
///
/// Every call checks out one connection, runs the closure on the blocking pool and hands the connection back.
#[derive(Clone)]
pub struct DatabasePool(Pool);

impl DatabasePool {
    /// Run `f` on a pooled connection.
    pub async fn interact<F, R>(&self, f: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self
            .0
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("failed to check out database connection: {}", e))?;

        let result = conn
            .interact(f)
            .await
            .map_err(|e| anyhow::anyhow!("database interaction failed: {:?}", e))??;

        Ok(result)
    }

    /// Execute one or more statements.
    pub async fn execute_batch(&self, sql: &str) -> anyhow::Result<()> {
        let sql = sql.to_owned();
        self.interact(move |c| c.execute_batch(&sql)).await
    }

    /// Maximum number of connections.
    pub fn max_size(&self) -> usize {
        self.0.status().max_size
    }
}

/// Open a pool of at most `pool_size` connections to the database at `path`.
pub async fn connect(path: &str, pool_size: usize) -> anyhow::Result<DatabasePool> {
    anyhow::ensure!(pool_size > 0, "database pool size must be at least 1");

    let mut config = Config::new(path);
    config.pool = Some(PoolConfig::new(pool_size));

    let pool = config
        .create_pool(Runtime::Tokio1)
        .map_err(|e| anyhow::anyhow!("Failed to create database pool for {}: {}", path, e))?;

    let db = DatabasePool(pool);

    // Fail at startup rather than on the first query.
    db.interact(|c| c.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
        .await?;
    tracing::debug!(path, pool_size, "database pool ready");

    Ok(db)
}
