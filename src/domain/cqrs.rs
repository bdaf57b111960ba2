//! 命令/查询分发
//!
//! 使用显式注册表把请求类型名称映射到处理器，不依赖运行时扫描

use crate::error::DispatchError;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 命令trait
pub trait Command: Send + 'static {
    /// 命令类型名称
    const KIND: &'static str;
    /// 命令返回值，无返回值的命令使用 `()`
    type Response: Send + 'static;
}

/// 查询trait
pub trait Query: Send + 'static {
    /// 查询类型名称
    const KIND: &'static str;
    /// 查询结果
    type Response: Send + 'static;
}

/// 命令处理器
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C) -> Result<C::Response, DispatchError>;
}

/// 查询处理器
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: Q) -> Result<Q::Response, DispatchError>;
}

type HandlerSlot = Box<dyn Any + Send + Sync>;

/// 分发器
///
/// 启动时注册全部处理器，之后只读共享。
#[derive(Default)]
pub struct Dispatcher {
    commands: HashMap<&'static str, HandlerSlot>,
    queries: HashMap<&'static str, HandlerSlot>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令处理器
    pub fn register_command<C, H>(&mut self, handler: H) -> Result<(), DispatchError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        if self.commands.contains_key(C::KIND) {
            return Err(DispatchError::Duplicate(C::KIND));
        }
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        self.commands.insert(C::KIND, Box::new(handler));
        Ok(())
    }

    /// 注册查询处理器
    pub fn register_query<Q, H>(&mut self, handler: H) -> Result<(), DispatchError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        if self.queries.contains_key(Q::KIND) {
            return Err(DispatchError::Duplicate(Q::KIND));
        }
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        self.queries.insert(Q::KIND, Box::new(handler));
        Ok(())
    }

    /// 发送命令
    pub async fn send<C: Command>(&self, command: C) -> Result<C::Response, DispatchError> {
        let handler = self
            .commands
            .get(C::KIND)
            .and_then(|slot| slot.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
            .ok_or(DispatchError::NoHandler(C::KIND))?;

        debug!(kind = C::KIND, "分发命令");
        handler.handle(command).await
    }

    /// 执行查询
    pub async fn ask<Q: Query>(&self, query: Q) -> Result<Q::Response, DispatchError> {
        let handler = self
            .queries
            .get(Q::KIND)
            .and_then(|slot| slot.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .cloned()
            .ok_or(DispatchError::NoHandler(Q::KIND))?;

        debug!(kind = Q::KIND, "分发查询");
        handler.handle(query).await
    }

    /// 已注册的命令类型
    pub fn command_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.commands.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// 已注册的查询类型
    pub fn query_kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.queries.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.command_kinds())
            .field("queries", &self.query_kinds())
            .finish()
    }
}
