// Database Manager for the meeting store
// Owns the SQLite connection and the model registry

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::migrations;
use super::registry::SchemaRegistry;
use crate::config::StoreConfig;

/// Database manager that owns the SQLite connection
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    registry: SchemaRegistry,
}

impl DatabaseManager {
    /// Create a new DatabaseManager with the database at the specified path
    pub fn new(db_path: PathBuf) -> Result<Self> {
        Self::open(&StoreConfig {
            database_path: db_path,
            ..StoreConfig::default()
        })
    }

    /// Open the configured database and bring its schema up to date
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let conn = Self::connect(config)?;

        migrations::run_migrations(&conn).context("Failed to run database migrations")?;

        let registry = SchemaRegistry::with_models().context("Invalid model definitions")?;

        log::info!("Database initialized at: {:?}", config.database_path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: config.database_path.clone(),
            registry,
        })
    }

    /// Open a connection with the configured pragmas, without migrating
    pub fn connect(config: &StoreConfig) -> Result<Connection> {
        let db_path = &config.database_path;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(db_path).context("Failed to open database")?;

        if config.foreign_keys {
            conn.execute("PRAGMA foreign_keys = ON", [])
                .context("Failed to enable foreign keys")?;
        }
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .context("Failed to set busy timeout")?;

        Ok(conn)
    }

    /// Execute a function with access to the database connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock database connection: {}", e))?;
        f(&conn)
    }

    /// Execute a function inside a transaction, committed when it returns `Ok`
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.with_connection(|conn| {
            let tx = conn
                .unchecked_transaction()
                .context("Failed to start transaction")?;
            let result = f(&tx)?;
            tx.commit().context("Failed to commit transaction")?;
            Ok(result)
        })
    }

    /// Registered model descriptors
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<i32> {
        self.with_connection(migrations::get_schema_version)
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_database_creation() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let manager = DatabaseManager::new(db_path.clone()).unwrap();
        assert!(db_path.exists());
        assert_eq!(manager.db_path(), db_path.as_path());
        assert_eq!(manager.schema_version().unwrap(), migrations::latest_version());
        assert!(manager.registry().get("Meeting").is_some());

        manager
            .with_connection(|conn| {
                let count: i32 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                assert_eq!(count, 0);
                let fk: bool = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                assert!(fk);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let dir = tempdir().unwrap();
        let manager = DatabaseManager::new(dir.path().join("test.db")).unwrap();

        let result: Result<()> = manager.with_transaction(|conn| {
            conn.execute(
                r#"INSERT INTO users ("email", "password") VALUES ('a@b.com', 'x')"#,
                [],
            )?;
            anyhow::bail!("abort")
        });
        assert!(result.is_err());

        let count: i32 = manager
            .with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_foreign_keys_can_be_disabled() {
        let dir = tempdir().unwrap();
        let config = StoreConfig {
            database_path: dir.path().join("test.db"),
            foreign_keys: false,
            ..StoreConfig::default()
        };
        let manager = DatabaseManager::open(&config).unwrap();
        let fk: bool = manager
            .with_connection(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .unwrap();
        assert!(!fk);
    }
}
