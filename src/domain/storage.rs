//! SQLite 存储
//!
//! 每次操作在阻塞线程池中打开一个连接，操作结束即释放

use crate::error::StorageError;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entities (
    kind        TEXT NOT NULL,
    id          TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT,
    payload     TEXT NOT NULL,
    PRIMARY KEY (kind, id)
);
CREATE INDEX IF NOT EXISTS idx_entities_created ON entities (kind, created_at);
";

/// SQLite 数据库句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteStore {
    /// 数据库文件路径
    path: PathBuf,
}

impl SqliteStore {
    /// 使用数据库文件路径创建
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 从连接字符串创建
    ///
    /// 支持 `Data Source=app.db;Cache=Shared` 形式，也接受裸路径。
    pub fn from_connection_string(connection_string: &str) -> Result<Self, StorageError> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(StorageError::InvalidConnectionString(
                "连接字符串为空".to_string(),
            ));
        }

        if !trimmed.contains('=') {
            return Ok(Self::new(trimmed));
        }

        trimmed
            .split(';')
            .filter_map(|part| part.split_once('='))
            .find(|(key, _)| {
                let key = key.trim().to_ascii_lowercase();
                key == "data source" || key == "datasource" || key == "filename"
            })
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .map(Self::new)
            .ok_or_else(|| StorageError::InvalidConnectionString(connection_string.to_string()))
    }

    /// 数据库文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 确保数据库与表结构存在
    pub async fn ensure_created(&self) -> Result<(), StorageError> {
        self.with_connection(true, |conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        info!("数据库已就绪: {}", self.path.display());
        Ok(())
    }

    /// 检查数据库是否可连接
    ///
    /// 不会创建缺失的数据库文件。
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.with_connection(false, |conn| {
            let one: i64 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
            debug!("数据库连通性检查返回 {one}");
            Ok(())
        })
        .await
    }

    /// 在阻塞线程中打开连接并执行操作
    pub(crate) async fn with_connection<T, F>(&self, create: bool, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::open(&path, create)?;
            f(&conn)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }

    fn open(path: &Path, create: bool) -> Result<Connection, StorageError> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        Ok(Connection::open_with_flags(path, flags)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_connection_string_parsing() {
        let store = SqliteStore::from_connection_string("Data Source=TemplateDb_Dev.db").unwrap();
        assert_eq!(store.path(), Path::new("TemplateDb_Dev.db"));

        let store =
            SqliteStore::from_connection_string("Cache=Shared; data source = app.db ;Mode=ReadWrite")
                .unwrap();
        assert_eq!(store.path(), Path::new("app.db"));

        let store = SqliteStore::from_connection_string("/var/lib/app/app.db").unwrap();
        assert_eq!(store.path(), Path::new("/var/lib/app/app.db"));

        assert!(SqliteStore::from_connection_string("").is_err());
        assert!(SqliteStore::from_connection_string("Cache=Shared").is_err());
        assert!(SqliteStore::from_connection_string("Data Source=").is_err());
    }

    #[tokio::test]
    async fn test_ping_requires_existing_database() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("missing.db"));

        assert!(store.ping().await.is_err());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_ensure_created_then_ping() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("app.db"));

        store.ensure_created().await.unwrap();
        assert!(store.path().exists());
        store.ping().await.unwrap();

        // 重复创建是幂等的
        store.ensure_created().await.unwrap();
    }
}
