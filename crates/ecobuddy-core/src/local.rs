use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EcoError, Result};

/// Key under which the user's stats are mirrored.
pub const STATS_KEY: &str = "userStats";

/// Client-side persistent key-value storage.
///
/// One SQLite table, `kv(key, value)`, holding JSON values. Reads and writes
/// are synchronous and tiny, so store operations call them inline.
#[derive(Clone)]
pub struct LocalKv {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl LocalKv {
    /// Open (or create) a file-backed store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path)
            .map_err(|e| EcoError::Storage(format!("failed to open local store: {e}")))?;
        Self::init(conn, path)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EcoError::Storage(format!("failed to open in-memory local store: {e}")))?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    /// Open the path from config, or `~/.config/ecobuddy/local.db`.
    pub fn open_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::open(p),
            None => {
                let dir = crate::config::config_dir().ok_or_else(|| {
                    EcoError::Config("cannot determine config directory".to_string())
                })?;
                Self::open(dir.join("local.db"))
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(|e| EcoError::Storage(format!("failed to create kv table: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EcoError::Storage(format!("failed to acquire local store lock: {e}")))
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Read and decode a JSON value. A value that fails to decode is an error,
    /// not a miss; callers decide whether to fall back.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw)
    }
}
