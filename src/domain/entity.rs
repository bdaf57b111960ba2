//! 实体基础数据
//!
//! 所有实体通过组合 [`EntityMeta`] 获得标识与时间戳

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 实体标识与时间戳
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// 实体ID
    pub id: Uuid,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最后更新时间
    pub updated_at: Option<DateTime<Utc>>,
}

impl EntityMeta {
    /// 创建新的实体元数据（随机ID）
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// 使用指定ID创建实体元数据
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// 刷新更新时间
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// 实体trait
pub trait Entity: Clone + Send + Sync + 'static {
    /// 实体类型名称，用于存储分区
    const KIND: &'static str;

    /// 实体元数据
    fn meta(&self) -> &EntityMeta;

    /// 可变实体元数据
    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// 实体ID
    fn id(&self) -> Uuid {
        self.meta().id
    }

    /// 刷新更新时间
    fn touch(&mut self) {
        self.meta_mut().touch();
    }
}

/// 传输用的实体基础字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDto {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&EntityMeta> for EntityDto {
    fn from(meta: &EntityMeta) -> Self {
        Self {
            id: meta.id,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }
}
