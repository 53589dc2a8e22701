// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use daydream_core::DaydreamError;
use tracing::debug;

use crate::migrations;

const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Convert a tokio-rusqlite error into `DaydreamError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> DaydreamError {
    DaydreamError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single SQLite writer connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens the database at `path` in WAL mode and applies migrations.
    pub async fn open(path: &str) -> Result<Self, DaydreamError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, DaydreamError> {
        // Migrations need a synchronous connection; run them off the runtime
        // before the background writer opens the same file.
        let owned = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), DaydreamError> {
            let mut conn = rusqlite::Connection::open(&owned).map_err(DaydreamError::storage)?;
            apply_pragmas(&conn, wal_mode).map_err(DaydreamError::storage)?;
            migrations::run_migrations(&mut conn)
        })
        .await
        .map_err(|e| DaydreamError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| DaydreamError::Storage {
                source: Box::new(e),
            })?;
        conn.call(move |conn| -> Result<(), rusqlite::Error> { apply_pragmas(conn, wal_mode) })
            .await
            .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The background connection every query goes through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the background connection.
    pub async fn close(&self) -> Result<(), DaydreamError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn
            .clone()
            .close()
            .await
            .map_err(|e| DaydreamError::Storage {
                source: Box::new(e),
            })?;
        debug!("database closed");
        Ok(())
    }
}

fn apply_pragmas(conn: &rusqlite::Connection, wal_mode: bool) -> Result<(), rusqlite::Error> {
    conn.busy_timeout(std::time::Duration::from_millis(u64::from(BUSY_TIMEOUT_MS)))?;
    if wal_mode {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    }
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}
