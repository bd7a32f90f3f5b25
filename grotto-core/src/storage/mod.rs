pub mod ledger_store;

pub use ledger_store::LedgerStore;

use crate::error::{CoreError, Result};
use rusqlite::Connection;
use std::path::Path;
use tokio::sync::Mutex;

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    /// Database that lives only as long as this handle.
    pub async fn in_memory() -> Result<Self> {
        let storage = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        // Wagers table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS wagers (
                id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL,
                creator TEXT NOT NULL,
                status TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS wagers_by_creator ON wagers (creator)",
            [],
        )?;

        // Event log
        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                body TEXT NOT NULL
            )",
            [],
        )?;

        // Escrow entries
        conn.execute(
            "CREATE TABLE IF NOT EXISTS escrow_entries (
                position INTEGER PRIMARY KEY,
                id TEXT UNIQUE NOT NULL,
                kind TEXT NOT NULL,
                account TEXT NOT NULL,
                wager_id INTEGER,
                amount INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )?;

        // Role grants
        conn.execute(
            "CREATE TABLE IF NOT EXISTS roles (
                scope TEXT NOT NULL,
                role TEXT NOT NULL,
                address TEXT NOT NULL,
                PRIMARY KEY (scope, role, address)
            )",
            [],
        )?;

        // Key/value metadata
        conn.execute(
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
