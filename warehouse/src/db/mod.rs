pub mod copy;

use async_trait::async_trait;
use common::Result;
use common::config::WarehouseConfig;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

/// Seam over the relational warehouse.
///
/// Everything the engine needs from the database goes through this trait
/// so the partition/lifecycle logic can be exercised against a recording
/// fake in tests. One session per job invocation; every statement commits
/// independently, with no wrapping transaction.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute one DDL/DML statement, returning the affected row count.
    async fn execute(&self, sql: &str) -> Result<u64>;

    /// Run a single-column, single-row query; `None` when no rows match.
    async fn select_optional_string(&self, sql: &str) -> Result<Option<String>>;

    /// Whether a table exists, per pg_tables.
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool>;

    /// Number of CHECK constraints on a table. A loaded-but-unconstrained
    /// partition reports zero, which downstream builds treat as
    /// load-in-progress.
    async fn check_constraint_count(&self, schema: &str, table: &str) -> Result<i64>;
}

pub struct PostgresWarehouse {
    client: Client,
}

impl PostgresWarehouse {
    /// Connect using explicit configuration; the connection driver task is
    /// spawned onto the runtime.
    pub async fn connect(config: &WarehouseConfig) -> Result<Self> {
        let (client, connection) =
            tokio_postgres::connect(&config.connection_string(), NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "warehouse connection error");
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    async fn execute(&self, sql: &str) -> Result<u64> {
        debug!(sql, "executing statement");
        let rows = self.client.execute(sql, &[]).await?;
        Ok(rows)
    }

    async fn select_optional_string(&self, sql: &str) -> Result<Option<String>> {
        let row = self.client.query_opt(sql, &[]).await?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        let row = self
            .client
            .query_one(
                "SELECT EXISTS (SELECT FROM pg_tables WHERE schemaname = $1 AND tablename = $2)",
                &[&schema, &table],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn check_constraint_count(&self, schema: &str, table: &str) -> Result<i64> {
        let row = self
            .client
            .query_one(
                "SELECT count(*) FROM pg_constraint con \
                 JOIN pg_class rel ON rel.oid = con.conrelid \
                 JOIN pg_namespace nsp ON nsp.oid = rel.relnamespace \
                 WHERE nsp.nspname = $1 AND rel.relname = $2 AND con.contype = 'c'",
                &[&schema, &table],
            )
            .await?;
        Ok(row.get(0))
    }
}
