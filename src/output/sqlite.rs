use super::{CycleCursor, OutputHandler};
use crate::error::{Error, Result};
use crate::poller::DashboardState;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::path::PathBuf;

pub struct SqliteOutput {
    pool: SqlitePool,
    table_name: String,
    initialized: bool,
    cursor: CycleCursor,
}

impl SqliteOutput {
    pub async fn new(path: PathBuf, table_name: String) -> Result<Self> {
        if !table_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Config(format!("invalid table name: {}", table_name)));
        }

        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&conn_str).await?;

        Ok(Self {
            pool,
            table_name,
            initialized: false,
            cursor: CycleCursor::default(),
        })
    }

    async fn ensure_table(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let query = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY,
                sampled_at TEXT NOT NULL,
                block_height INTEGER NOT NULL,
                window_transaction_count INTEGER NOT NULL,
                window_contract_creation_count INTEGER NOT NULL,
                approximate_throughput REAL,
                blocks_requested INTEGER NOT NULL,
                blocks_sampled INTEGER NOT NULL,
                missing_blocks TEXT NOT NULL
            )",
            self.table_name
        );

        sqlx::query(&query).execute(&self.pool).await?;
        self.initialized = true;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl OutputHandler for SqliteOutput {
    async fn write(&mut self, state: &DashboardState) -> Result<()> {
        let Some(snapshot) = self.cursor.next(state) else {
            return Ok(());
        };
        self.ensure_table().await?;

        let query = format!(
            "INSERT INTO {} (sampled_at, block_height, window_transaction_count, \
             window_contract_creation_count, approximate_throughput, blocks_requested, \
             blocks_sampled, missing_blocks) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            self.table_name
        );

        sqlx::query(&query)
            .bind(snapshot.sampled_at.to_rfc3339())
            .bind(snapshot.block_height as i64)
            .bind(snapshot.window_transaction_count as i64)
            .bind(snapshot.window_contract_creation_count as i64)
            .bind(snapshot.approximate_throughput)
            .bind(snapshot.blocks_requested as i64)
            .bind(snapshot.blocks_sampled as i64)
            .bind(serde_json::to_string(&snapshot.missing_blocks)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}
