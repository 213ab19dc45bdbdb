use crate::errors::{DBError, Result};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct SQLiteDB {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteDB {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(|e| DBError::ConnectionError {
            message: format!("open {} err: {}", db_path, e),
        })?;

        let _ = conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()));
        let _ = conn.execute("PRAGMA synchronous = NORMAL", []);
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(SQLiteDB {
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|e| DBError::LockError {
            message: format!("Failed to acquire lock: {}", e),
        })
    }

    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn execute_update(&self, query: &str, params: &[&dyn rusqlite::ToSql]) -> Result<usize> {
        let conn = self.lock()?;
        let affected = conn.execute(query, params)?;
        Ok(affected)
    }

    /// 在同一个事务中执行operation，出错时回滚
    pub fn with_transaction<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        // 出错时tx被drop，自动回滚
        let result = operation(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    pub fn query_map<T, F>(
        &self,
        query: &str,
        params: &[&dyn rusqlite::ToSql],
        map_row: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(query)?;
        let rows = stmt.query_map(params, map_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let names = self.query_map(
            "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
            &[&table_name],
            |row| row.get::<_, String>(0),
        )?;
        Ok(!names.is_empty())
    }
}

// 共享同一个连接
impl Clone for SQLiteDB {
    fn clone(&self) -> Self {
        SQLiteDB {
            connection: Arc::clone(&self.connection),
        }
    }
}
