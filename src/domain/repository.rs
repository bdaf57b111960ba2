//! 通用仓储
//!
//! 提供按ID查询、查询全部与新增三种操作

use crate::domain::entity::Entity;
use crate::domain::storage::SqliteStore;
use crate::error::StorageError;
use async_trait::async_trait;
use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// 仓储trait
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// 按ID获取实体
    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, StorageError>;

    /// 获取全部实体（按创建时间排序）
    async fn get_all(&self) -> Result<Vec<T>, StorageError>;

    /// 新增实体，ID已存在时返回冲突错误
    async fn add(&self, entity: T) -> Result<(), StorageError>;
}

/// 内存仓储
#[derive(Debug)]
pub struct InMemoryRepository<T> {
    items: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for InMemoryRepository<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, StorageError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<T>, StorageError> {
        let mut all: Vec<T> = self.items.read().await.values().cloned().collect();
        all.sort_by_key(|entity| entity.meta().created_at);
        Ok(all)
    }

    async fn add(&self, entity: T) -> Result<(), StorageError> {
        let mut items = self.items.write().await;
        let id = entity.id();
        if items.contains_key(&id) {
            return Err(StorageError::Conflict {
                kind: T::KIND,
                id: id.to_string(),
            });
        }
        items.insert(id, entity);
        Ok(())
    }
}

/// SQLite 仓储
///
/// 实体以 JSON 形式存放在 `entities` 表中，按实体类型分区。
#[derive(Debug)]
pub struct SqliteRepository<T> {
    store: SqliteStore,
    _entity: PhantomData<fn() -> T>,
}

impl<T> SqliteRepository<T> {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for SqliteRepository<T> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

#[async_trait]
impl<T> Repository<T> for SqliteRepository<T>
where
    T: Entity + Serialize + DeserializeOwned,
{
    async fn get_by_id(&self, id: Uuid) -> Result<Option<T>, StorageError> {
        let payload: Option<String> = self
            .store
            .with_connection(false, move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT payload FROM entities WHERE kind = ?1 AND id = ?2",
                        params![T::KIND, id.to_string()],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        payload
            .map(|json| serde_json::from_str(&json).map_err(StorageError::from))
            .transpose()
    }

    async fn get_all(&self) -> Result<Vec<T>, StorageError> {
        let payloads: Vec<String> = self
            .store
            .with_connection(false, |conn| {
                let mut stmt = conn.prepare(
                    "SELECT payload FROM entities WHERE kind = ?1 ORDER BY created_at, id",
                )?;
                let rows = stmt.query_map(params![T::KIND], |row| row.get(0))?;
                Ok(rows.collect::<Result<Vec<String>, _>>()?)
            })
            .await?;

        payloads
            .iter()
            .map(|json| serde_json::from_str(json).map_err(StorageError::from))
            .collect()
    }

    async fn add(&self, entity: T) -> Result<(), StorageError> {
        let meta = entity.meta().clone();
        let payload = serde_json::to_string(&entity)?;

        self.store
            .with_connection(false, move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO entities (kind, id, created_at, updated_at, payload)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        T::KIND,
                        meta.id.to_string(),
                        meta.created_at.to_rfc3339(),
                        meta.updated_at.map(|t| t.to_rfc3339()),
                        payload
                    ],
                );

                match inserted {
                    Ok(_) => Ok(()),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == ErrorCode::ConstraintViolation =>
                    {
                        Err(StorageError::Conflict {
                            kind: T::KIND,
                            id: meta.id.to_string(),
                        })
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await
    }
}
