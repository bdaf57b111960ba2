//! 领域基础设施模块
//!
//! 提供实体基础字段、通用仓储、SQLite 存储与命令/查询分发

pub mod cqrs;
pub mod entity;
pub mod repository;
pub mod storage;

// 重新导出主要类型
pub use cqrs::{Command, CommandHandler, Dispatcher, Query, QueryHandler};
pub use entity::{Entity, EntityDto, EntityMeta};
pub use repository::{InMemoryRepository, Repository, SqliteRepository};
pub use storage::SqliteStore;
