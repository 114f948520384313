//! SQLite-backed item store.
//!
//! A single connection guarded by a mutex: every `append` is serialised per
//! store, so ids follow the order in which appends actually land.

use crate::domain::model::{Item, NewItem};
use crate::domain::ports::ItemStore;
use crate::utils::error::{HarvestError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        price TEXT NOT NULL,
        source TEXT NOT NULL,
        scraped_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_items_source ON items(source);
";

pub struct SqliteItemStore {
    conn: Mutex<Connection>,
}

impl SqliteItemStore {
    /// 開啟 (或建立) 資料庫檔案，父目錄不存在時一併建立
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| HarvestError::Storage {
                    message: format!("create {}: {}", parent.display(), e),
                })?;
            }
        }

        let conn = Connection::open(path)?;
        tracing::debug!("Opened item store at {}", path.display());
        Ok(Self::with_connection(conn))
    }

    /// 記憶體資料庫 (測試用)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| HarvestError::Storage {
            message: "item store lock poisoned".to_string(),
        })
    }
}

impl ItemStore for SqliteItemStore {
    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn append(&self, item: NewItem) -> Result<Item> {
        let conn = self.lock()?;
        let scraped_at = Utc::now();

        conn.execute(
            "INSERT INTO items (title, price, source, scraped_at) VALUES (?1, ?2, ?3, ?4)",
            params![item.title, item.price, item.source, scraped_at.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Item {
            id,
            title: item.title,
            price: item.price,
            source: item.source,
            scraped_at,
        })
    }

    fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn all(&self) -> Result<Vec<Item>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, title, price, source, scraped_at FROM items ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (id, title, price, source, scraped_at) = row?;
            let scraped_at = DateTime::parse_from_rfc3339(&scraped_at)
                .map_err(|e| HarvestError::Storage {
                    message: format!("item {} has a corrupt timestamp: {}", id, e),
                })?
                .with_timezone(&Utc);

            items.push(Item {
                id,
                title,
                price,
                source,
                scraped_at,
            });
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store() -> SqliteItemStore {
        let store = SqliteItemStore::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let store = store();
        store.append(NewItem::new("Laptop", "$999.00", "amazon")).unwrap();

        let before = store.all().unwrap();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
        let after = store.all().unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_append_assigns_increasing_unique_ids() {
        let store = store();
        let titles = ["A", "B", "A", "", "C"];
        for title in titles {
            store.append(NewItem::new(title, "$1.00", "static")).unwrap();
        }

        let items = store.all().unwrap();
        assert_eq!(items.len(), titles.len());
        assert!(items.windows(2).all(|w| w[0].id < w[1].id));
        let read_titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(read_titles, titles);
    }

    #[test]
    fn test_all_rereads_current_state() {
        let store = store();
        assert!(store.all().unwrap().is_empty());

        store.append(NewItem::unpriced("Quote", "quotes")).unwrap();
        let items = store.all().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, "N/A");
        assert_eq!(items[0].source, "quotes");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_append_without_schema_fails() {
        let store = SqliteItemStore::open_in_memory().unwrap();
        let err = store.append(NewItem::new("A", "$1", "x")).unwrap_err();
        assert!(matches!(err, HarvestError::Storage { .. }));
    }

    #[test]
    fn test_concurrent_appends_keep_ids_unique() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for n in 0..25 {
                        store
                            .append(NewItem::new(format!("{}-{}", worker, n), "$1", "threads"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let items = store.all().unwrap();
        assert_eq!(items.len(), 100);
        assert!(items.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("items.db");

        let store = SqliteItemStore::open(&path).unwrap();
        store.ensure_schema().unwrap();
        store.append(NewItem::new("Desk", "$120", "ebay")).unwrap();
        drop(store);

        let reopened = SqliteItemStore::open(&path).unwrap();
        reopened.ensure_schema().unwrap();
        assert_eq!(reopened.all().unwrap().len(), 1);
    }
}
