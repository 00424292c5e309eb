//! SQLite persistence layer for the pomodoro document.

use crate::models::{PomodoroData, STORAGE_KEY};
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory")]
    DirectoryCreation,
}

/// Loads and saves the whole document. Last writer wins.
pub trait DataStore {
    /// Returns the stored document, creating and saving a default one when
    /// nothing is stored yet.
    fn load(&self) -> Result<PomodoroData, DatabaseError>;

    /// Replaces the stored document. Stamps `updated_at`.
    fn save(&self, data: &PomodoroData) -> Result<(), DatabaseError>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens the database at `path`, initializing tables if needed.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        // Ensure directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|_| DatabaseError::DirectoryCreation)?;
        }

        let conn = Connection::open(path)?;
        Self::initialize_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing).
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_tables(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_tables(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Default location inside the platform data directory.
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("com", "pomodrive", "Pomodrive")
            .map(|dirs| dirs.data_dir().join("pomodrive.db"))
            .unwrap_or_else(|| PathBuf::from("pomodrive.db"))
    }

    fn read_raw(&self) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?",
                [STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl DataStore for Database {
    fn load(&self) -> Result<PomodoroData, DatabaseError> {
        let data = match self.read_raw()? {
            Some(json) => serde_json::from_str::<PomodoroData>(&json)?.normalized(),
            None => {
                log::info!("No stored data, writing defaults");
                PomodoroData::default()
            }
        };
        self.save(&data)?;
        Ok(data)
    }

    fn save(&self, data: &PomodoroData) -> Result<(), DatabaseError> {
        let payload = PomodoroData {
            updated_at: Utc::now(),
            ..data.clone()
        };
        let json = serde_json::to_string(&payload)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (key, value) VALUES (?, ?)",
            [STORAGE_KEY, json.as_str()],
        )?;
        Ok(())
    }
}
