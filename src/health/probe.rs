//! 健康探针注册
//!
//! 定义探针接口、探针注册信息、注册表以及标签过滤器

use crate::error::{ConfigError, ProbeError};
use crate::health::result::ProbeOutcome;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 健康探针trait，定义检测接口
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// 执行一次检测
    ///
    /// # 返回
    /// * `Result<ProbeOutcome, ProbeError>` - 检测结论，`Err` 会被聚合器记为 Unhealthy
    async fn check(&self) -> Result<ProbeOutcome, ProbeError>;
}

/// 由闭包构成的探针
pub struct FnProbe<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> HealthProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>> + Send,
{
    async fn check(&self) -> Result<ProbeOutcome, ProbeError> {
        (self.f)().await
    }
}

/// 用闭包创建探针
pub fn probe_fn<F, Fut>(f: F) -> FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ProbeOutcome, ProbeError>> + Send,
{
    FnProbe { f }
}

/// 探针注册信息
#[derive(Clone)]
pub struct ProbeRegistration {
    /// 唯一名称
    pub name: String,
    /// 探针实现
    pub probe: Arc<dyn HealthProbe>,
    /// 标签集合
    pub tags: BTreeSet<String>,
}

impl fmt::Debug for ProbeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeRegistration")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// 探针注册表
///
/// 启动时构建一次，之后只读共享。
#[derive(Debug, Default)]
pub struct HealthRegistry {
    registrations: Vec<ProbeRegistration>,
}

impl HealthRegistry {
    /// 创建注册表构建器
    pub fn builder() -> HealthRegistryBuilder {
        HealthRegistryBuilder::default()
    }

    /// 所有注册信息（按注册顺序）
    pub fn registrations(&self) -> &[ProbeRegistration] {
        &self.registrations
    }

    /// 按过滤器选择注册信息
    pub fn select<'a>(
        &'a self,
        filter: Option<&'a TagFilter>,
    ) -> impl Iterator<Item = &'a ProbeRegistration> + 'a {
        self.registrations
            .iter()
            .filter(move |registration| filter.map_or(true, |f| f.matches(&registration.tags)))
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// 注册表构建器
#[derive(Debug, Default)]
pub struct HealthRegistryBuilder {
    registrations: Vec<ProbeRegistration>,
}

impl HealthRegistryBuilder {
    /// 注册探针
    ///
    /// # 参数
    /// * `name` - 唯一名称
    /// * `probe` - 探针实现
    /// * `tags` - 标签
    pub fn register<P, I, S>(mut self, name: impl Into<String>, probe: P, tags: I) -> Self
    where
        P: HealthProbe + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registrations.push(ProbeRegistration {
            name: name.into(),
            probe: Arc::new(probe),
            tags: tags.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// 构建注册表，名称重复时返回错误
    pub fn build(self) -> Result<HealthRegistry, ConfigError> {
        let mut seen = BTreeSet::new();
        for registration in &self.registrations {
            if registration.name.trim().is_empty() {
                return Err(ConfigError::ValidationError("探针名称不能为空".to_string()));
            }
            if !seen.insert(registration.name.as_str()) {
                return Err(ConfigError::DuplicateProbe {
                    name: registration.name.clone(),
                });
            }
        }

        Ok(HealthRegistry {
            registrations: self.registrations,
        })
    }
}

type TagPredicate = dyn Fn(&BTreeSet<String>) -> bool + Send + Sync;

/// 标签过滤器
#[derive(Clone)]
pub struct TagFilter {
    predicate: Arc<TagPredicate>,
}

impl TagFilter {
    /// 包含任一标签的探针
    pub fn any_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let wanted: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        Self::custom(move |tags| tags.iter().any(|tag| wanted.contains(tag)))
    }

    /// 不包含任何给定标签的探针
    pub fn none_of<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let excluded: BTreeSet<String> = tags.into_iter().map(Into::into).collect();
        Self::custom(move |tags| !tags.iter().any(|tag| excluded.contains(tag)))
    }

    /// 自定义谓词
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&BTreeSet<String>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// 判断标签集合是否匹配
    pub fn matches(&self, tags: &BTreeSet<String>) -> bool {
        (self.predicate)(tags)
    }
}

impl fmt::Debug for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagFilter").finish_non_exhaustive()
    }
}
