//! SQLite alert store.

use pricealert_core::{Alert, AlertId, Direction};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::SqliteConnection;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Schema version written to `PRAGMA user_version` once migrations finish.
pub const SCHEMA_VERSION: i64 = 2;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Corrupt alert row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

type AlertRow = (i64, i64, i64, String, String, f64, String, i64);

// Legacy rows may lack an owner or a base asset.
const SELECT_ALERT: &str = "SELECT id, chat_id, COALESCE(user_id, 0), symbol, \
     COALESCE(base_asset, UPPER(symbol)), target, direction, created_at FROM alerts";

/// Durable alert storage.
///
/// Every call holds one lock for its whole duration and runs in its own
/// transaction, so calls are fully serialized and nothing spans two calls.
pub struct AlertStore {
    pool: SqlitePool,
    lock: Mutex<()>,
}

impl AlertStore {
    /// Open (or create) the store at `path` and bring the schema up to date.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        Self::connect_with(options).await
    }

    async fn connect_with(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            lock: Mutex::new(()),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&mut *tx)
            .await?;

        if version < 1 {
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS alerts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_id INTEGER NOT NULL,
                    user_id INTEGER,
                    symbol TEXT NOT NULL,
                    target REAL NOT NULL,
                    direction TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                )
                "#,
            )
            .execute(&mut *tx)
            .await?;
        }

        if version < 2 && !has_column(&mut *tx, "alerts", "base_asset").await? {
            sqlx::query("ALTER TABLE alerts ADD COLUMN base_asset TEXT")
                .execute(&mut *tx)
                .await?;
            info!("Added base_asset column to alerts table");
        }

        if version < SCHEMA_VERSION {
            // PRAGMA does not take bound parameters
            sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
                .execute(&mut *tx)
                .await?;
            debug!(from = version, to = SCHEMA_VERSION, "Alert store migrated");
        }

        tx.commit().await?;
        Ok(())
    }

    /// Current `PRAGMA user_version`.
    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        let _guard = self.lock.lock().await;
        let version = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Insert a new alert and return its id.
    ///
    /// `symbol` is stored lowercased and `base_asset` uppercased.
    pub async fn add(
        &self,
        chat_id: i64,
        user_id: i64,
        symbol: &str,
        base_asset: &str,
        target: f64,
        direction: Direction,
    ) -> Result<AlertId, StoreError> {
        let symbol = symbol.trim().to_lowercase();
        let base_asset = base_asset.trim().to_uppercase();
        if symbol.is_empty() || base_asset.is_empty() {
            return Err(StoreError::InvalidInput("empty symbol".to_string()));
        }
        if !target.is_finite() || target <= 0.0 {
            return Err(StoreError::InvalidInput(format!("target {}", target)));
        }

        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO alerts (chat_id, user_id, symbol, base_asset, target, direction, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(&symbol)
        .bind(&base_asset)
        .bind(target)
        .bind(direction.as_str())
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let id = AlertId(result.last_insert_rowid());
        debug!(alert_id = %id, chat_id, base = %base_asset, "Alert added");
        Ok(id)
    }

    /// Delete an alert if `user_id` owns it.
    ///
    /// Returns `false` both when the alert does not exist and when it belongs
    /// to someone else.
    pub async fn remove(&self, id: AlertId, user_id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM alerts WHERE id = ? AND COALESCE(user_id, 0) = ?")
            .bind(id.0)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Alerts for one chat, newest first. Corrupt rows are skipped.
    pub async fn list_for_chat(&self, chat_id: i64) -> Result<Vec<Alert>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "{} WHERE chat_id = ? ORDER BY id DESC",
            SELECT_ALERT
        ))
        .bind(chat_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(decode_rows(rows))
    }

    /// Every alert, oldest first. Corrupt rows are skipped.
    pub async fn list_all(&self) -> Result<Vec<Alert>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, AlertRow>(&format!("{} ORDER BY id ASC", SELECT_ALERT))
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(decode_rows(rows))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn has_column(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
) -> Result<bool, StoreError> {
    let names: Vec<String> =
        sqlx::query_scalar(&format!("SELECT name FROM pragma_table_info('{}')", table))
            .fetch_all(&mut *conn)
            .await?;
    Ok(names.iter().any(|name| name == column))
}

fn decode_rows(rows: Vec<AlertRow>) -> Vec<Alert> {
    rows.into_iter()
        .filter_map(|row| match alert_from_row(row) {
            Ok(alert) => Some(alert),
            Err(e) => {
                warn!(error = %e, "Skipping corrupt alert row");
                None
            }
        })
        .collect()
}

fn alert_from_row(row: AlertRow) -> Result<Alert, StoreError> {
    let (id, chat_id, user_id, symbol, base_asset, target, direction, created_at) = row;
    let direction = Direction::from_str(&direction).map_err(|_| StoreError::Corrupt {
        id,
        reason: format!("unknown direction '{}'", direction),
    })?;

    Ok(Alert {
        id: AlertId(id),
        chat_id,
        user_id,
        symbol,
        base_asset,
        target,
        direction,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn open_store() -> (TempDir, AlertStore) {
        let dir = TempDir::new().unwrap();
        let store = AlertStore::connect(dir.path().join("alerts.db")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_add_then_list_for_chat() {
        let (_dir, store) = open_store().await;

        let id = store
            .add(100, 7, "Btc", "btc", 64000.0, Direction::Above)
            .await
            .unwrap();

        let alerts = store.list_for_chat(100).await.unwrap();
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.id, id);
        assert_eq!(alert.chat_id, 100);
        assert_eq!(alert.user_id, 7);
        assert_eq!(alert.symbol, "btc");
        assert_eq!(alert.base_asset, "BTC");
        assert_eq!(alert.target, 64000.0);
        assert_eq!(alert.direction, Direction::Above);
        assert!(alert.created_at > 0);

        assert!(store.list_for_chat(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_increasing() {
        let (_dir, store) = open_store().await;

        let a = store.add(1, 1, "eth", "ETH", 3000.0, Direction::Above).await.unwrap();
        let b = store.add(1, 1, "eth", "ETH", 2000.0, Direction::Below).await.unwrap();
        store.remove(b, 1).await.unwrap();
        let c = store.add(1, 1, "eth", "ETH", 2500.0, Direction::Below).await.unwrap();

        assert!(a < b);
        assert!(b < c);
    }

    #[tokio::test]
    async fn test_list_ordering() {
        let (_dir, store) = open_store().await;

        let first = store.add(1, 1, "btc", "BTC", 1.0, Direction::Above).await.unwrap();
        let second = store.add(2, 2, "eth", "ETH", 1.0, Direction::Above).await.unwrap();
        let third = store.add(1, 1, "sol", "SOL", 1.0, Direction::Below).await.unwrap();

        let chat: Vec<AlertId> = store
            .list_for_chat(1)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(chat, vec![third, first]);

        let all: Vec<AlertId> = store.list_all().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(all, vec![first, second, third]);
    }

    #[tokio::test]
    async fn test_remove_requires_owner_and_succeeds_once() {
        let (_dir, store) = open_store().await;
        let id = store.add(1, 42, "btc", "BTC", 1.0, Direction::Above).await.unwrap();

        assert!(!store.remove(id, 43).await.unwrap());
        assert!(store.remove(id, 42).await.unwrap());
        assert!(!store.remove(id, 42).await.unwrap());
        assert!(!store.remove(AlertId(9999), 42).await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_input() {
        let (_dir, store) = open_store().await;

        let err = store
            .add(1, 1, "btc", "BTC", f64::NAN, Direction::Above)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));

        let err = store
            .add(1, 1, "  ", "BTC", 10.0, Direction::Above)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_reopen_keeps_alerts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerts.db");

        let store = AlertStore::connect(&path).await.unwrap();
        let id = store.add(5, 5, "doge", "DOGE", 0.1, Direction::Below).await.unwrap();
        store.close().await;

        let store = AlertStore::connect(&path).await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);
        let alerts = store.list_all().await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, id);
    }

    #[tokio::test]
    async fn test_migrates_legacy_table_without_base_asset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.db");

        {
            let options = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true);
            let pool = SqlitePool::connect_with(options).await.unwrap();
            sqlx::query(
                "CREATE TABLE alerts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_id INTEGER NOT NULL,
                    user_id INTEGER,
                    symbol TEXT NOT NULL,
                    target REAL NOT NULL,
                    direction TEXT NOT NULL,
                    created_at INTEGER NOT NULL
                )",
            )
            .execute(&pool)
            .await
            .unwrap();
            sqlx::query(
                "INSERT INTO alerts (chat_id, user_id, symbol, target, direction, created_at)
                 VALUES (1, 11, 'btc', 50000.0, 'above', 1700000000),
                        (1, NULL, 'eth', 1000.0, 'below', 1700000001)",
            )
            .execute(&pool)
            .await
            .unwrap();
            pool.close().await;
        }

        let store = AlertStore::connect(&path).await.unwrap();
        assert_eq!(store.schema_version().await.unwrap(), SCHEMA_VERSION);

        let alerts = store.list_all().await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].base_asset, "BTC");
        assert_eq!(alerts[0].user_id, 11);
        assert_eq!(alerts[0].created_at, 1_700_000_000);
        assert_eq!(alerts[1].base_asset, "ETH");
        assert_eq!(alerts[1].user_id, 0);

        // Ownerless legacy rows are still removable by the evaluator
        assert!(store.remove(alerts[1].id, 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped() {
        let (_dir, store) = open_store().await;
        let healthy = store.add(1, 1, "eth", "ETH", 2000.0, Direction::Below).await.unwrap();
        sqlx::query(
            "INSERT INTO alerts (chat_id, user_id, symbol, base_asset, target, direction, created_at)
             VALUES (1, 1, 'btc', 'BTC', 1.0, 'sideways', 0)",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, healthy);

        let chat = store.list_for_chat(1).await.unwrap();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat[0].id, healthy);
    }

    #[test]
    fn test_unknown_direction_is_corrupt() {
        let row: AlertRow = (3, 1, 1, "btc".into(), "BTC".into(), 1.0, "sideways".into(), 0);
        let err = alert_from_row(row).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { id: 3, .. }));
    }
}
