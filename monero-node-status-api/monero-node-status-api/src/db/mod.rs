// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use anyhow::{anyhow, Result};
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteAutoVacuum, SqliteConnectOptions, SqliteSynchronous},
    ConnectOptions, SqlitePool,
};
use std::{str::FromStr, time::Duration};

pub(crate) mod models;
pub(crate) mod queries;
mod query_wrapper;

pub(crate) use query_wrapper::{query, query_as};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub(crate) type DbPool = SqlitePool;

pub(crate) struct Storage {
    pool: DbPool,
}

impl Storage {
    pub async fn init(connection_url: String, busy_timeout: Duration) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(&connection_url)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout)
            .synchronous(SqliteSynchronous::Normal)
            .auto_vacuum(SqliteAutoVacuum::Incremental)
            .foreign_keys(true)
            .create_if_missing(true)
            .disable_statement_logging();

        let pool = sqlx::SqlitePool::connect_with(connect_options)
            .await
            .map_err(|err| anyhow!("Failed to connect to {}: {}", &connection_url, err))?;

        MIGRATOR.run(&pool).await?;

        // check the pragma took effect
        Self::assert_busy_timeout(pool.clone(), busy_timeout.as_secs() as i64).await?;

        Ok(Storage { pool })
    }

    /// Cloning pool is cheap, it's the same underlying set of connections
    pub fn pool_owned(&self) -> DbPool {
        self.pool.clone()
    }

    async fn assert_busy_timeout(pool: DbPool, expected_busy_timeout_s: i64) -> Result<()> {
        let mut conn = pool.acquire().await?;
        // Sqlite stores this value as miliseconds
        // https://www.sqlite.org/pragma.html#pragma_busy_timeout
        let actual_busy_timeout_ms: i64 = sqlx::query_scalar("PRAGMA busy_timeout;")
            .fetch_one(conn.as_mut())
            .await?;

        tracing::info!("PRAGMA busy_timeout={}ms", actual_busy_timeout_ms);
        let expected_busy_timeout_ms = expected_busy_timeout_s * 1000;

        if expected_busy_timeout_ms != actual_busy_timeout_ms {
            anyhow::bail!(
                "PRAGMA busy_timeout expected: {}ms, actual: {}ms",
                expected_busy_timeout_ms,
                actual_busy_timeout_ms
            );
        }

        Ok(())
    }
}

/// Single-connection in-memory database with all migrations applied.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) async fn test_pool() -> DbPool {
    use sqlx::sqlite::SqlitePoolOptions;

    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    // every new connection would see a fresh, empty database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(connect_options)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();

    pool
}
