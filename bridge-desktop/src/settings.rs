//! Settings Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{SettingValue, SettingsChange, SettingsStore, SettingsTransaction},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::broadcast;
use tracing::{debug, error};

const CHANGE_BUFFER_SIZE: usize = 32;

const UPSERT_SQL: &str = r#"
    INSERT INTO settings (key, value, value_type, updated_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        value_type = excluded.value_type,
        updated_at = excluded.updated_at
"#;

/// SQLite-backed settings store implementation
///
/// Stores each value together with its type tag so a boolean key read back as
/// a string (or vice versa) is reported instead of silently coerced. Every
/// write is announced on a broadcast channel; see [`SettingsStore::subscribe`].
pub struct SqliteSettingsStore {
    pool: SqlitePool,
    changes: broadcast::Sender<SettingsChange>,
}

impl SqliteSettingsStore {
    /// Create a new settings store with the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        // SQLite URLs want forward slashes
        let path_str = db_path.to_string_lossy().replace('\\', "/");
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path_str))
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid DB path: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        let store = Self::with_pool(pool).await?;
        debug!(path = ?db_path, "Initialized settings store");
        Ok(store)
    }

    /// Create an in-memory settings store (for testing)
    ///
    /// Limited to one connection: every SQLite in-memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        Self::with_pool(pool).await
    }

    /// Default location: `<config dir>/music-switcher/settings.db`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("music-switcher")
            .join("settings.db")
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                value_type TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to create table: {}", e)))?;

        let (changes, _) = broadcast::channel(CHANGE_BUFFER_SIZE);
        Ok(Self { pool, changes })
    }

    /// Current Unix timestamp in seconds
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    fn notify(&self, change: SettingsChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    async fn set_value(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .bind(value_type)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to set setting: {}", e)))?;

        debug!(key = key, value_type = value_type, "Stored setting");
        self.notify(SettingsChange::single(key));
        Ok(())
    }

    /// Get a value and verify its type
    async fn get_value(&self, key: &str, expected_type: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, value_type FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to get setting: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let value: String = row.get(0);
        let value_type: String = row.get(1);

        if value_type != expected_type {
            error!(
                key = key,
                expected = expected_type,
                actual = %value_type,
                "Type mismatch"
            );
            return Err(BridgeError::TypeMismatch {
                key: key.to_string(),
                expected: expected_type.to_string(),
                actual: value_type,
            });
        }

        Ok(Some(value))
    }
}

fn decode_value(key: &str, value: String, value_type: &str) -> Result<SettingValue> {
    match value_type {
        "string" => Ok(SettingValue::String(value)),
        "bool" => value.parse().map(SettingValue::Bool).map_err(|e| {
            BridgeError::OperationFailed(format!("Parse error for '{}': {}", key, e))
        }),
        other => Err(BridgeError::OperationFailed(format!(
            "Unknown value type '{}' for '{}'",
            other, key
        ))),
    }
}

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value, "string").await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key, "string").await
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, &value.to_string(), "bool").await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get_value(key, "bool").await? {
            Some(s) => Ok(Some(s.parse().map_err(|e| {
                BridgeError::OperationFailed(format!("Parse error for '{}': {}", key, e))
            })?)),
            None => Ok(None),
        }
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, SettingValue>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        // A single statement reads from one snapshot of the database.
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!(
            "SELECT key, value, value_type FROM settings WHERE key IN ({})",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for key in keys {
            query = query.bind(key.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to get settings: {}", e)))?;

        let mut values = HashMap::with_capacity(rows.len());
        for row in rows {
            let key: String = row.get(0);
            let value: String = row.get(1);
            let value_type: String = row.get(2);
            let decoded = decode_value(&key, value, &value_type)?;
            values.insert(key, decoded);
        }

        debug!(requested = keys.len(), found = values.len(), "Read settings");
        Ok(values)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to delete setting: {}", e))
            })?;

        debug!(key = key, "Deleted setting");
        self.notify(SettingsChange::single(key));
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to list keys: {}", e)))?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to clear settings: {}", e))
            })?;

        debug!("Cleared all settings");
        self.notify(SettingsChange::cleared());
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>> {
        let tx = self.pool.begin().await.map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Box::new(SqliteSettingsTransaction {
            tx: Some(tx),
            touched: Vec::new(),
            changes: self.changes.clone(),
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<SettingsChange> {
        self.changes.subscribe()
    }
}

/// SQLite settings transaction
///
/// Collects the keys it writes and announces them as one change on commit.
struct SqliteSettingsTransaction {
    tx: Option<sqlx::Transaction<'static, sqlx::Sqlite>>,
    touched: Vec<String>,
    changes: broadcast::Sender<SettingsChange>,
}

impl SqliteSettingsTransaction {
    async fn set_value(&mut self, key: &str, value: &str, value_type: &str) -> Result<()> {
        let tx = self.tx.as_mut().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .bind(value_type)
            .bind(SqliteSettingsStore::now())
            .execute(&mut **tx)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to set setting: {}", e)))?;

        if !self.touched.iter().any(|k| k == key) {
            self.touched.push(key.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsTransaction for SqliteSettingsTransaction {
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value, "string").await
    }

    async fn set_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, &value.to_string(), "bool").await
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        tx.commit()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to commit: {}", e)))?;

        debug!(keys = ?self.touched, "Committed transaction");
        if !self.touched.is_empty() {
            let _ = self.changes.send(SettingsChange {
                keys: std::mem::take(&mut self.touched),
            });
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        tx.rollback()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to rollback: {}", e)))?;

        debug!("Rolled back transaction");
        Ok(())
    }
}
