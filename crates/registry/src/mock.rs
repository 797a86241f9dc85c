//! Mock 注册表
//!
//! 用于测试的注册表，支持注入失败场景并记录调用。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use contracts::{ConnectionRecord, ConnectionRegistry, RecipientId, RegistryError};
use tracing::instrument;

use crate::MemoryRegistry;

/// Mock 注册表配置
#[derive(Debug, Default, Clone)]
pub struct MockRegistryConfig {
    /// list() 一律失败
    pub fail_list: bool,
    /// put() 一律失败
    pub fail_put: bool,
    /// delete() 对这些 ID 失败
    pub fail_delete: Vec<String>,
    /// delete() 记录调用后先等待这么久
    pub delete_delay: Option<Duration>,
}

/// Mock 注册表
///
/// 数据存放在内部的 `MemoryRegistry` 中，失败场景由配置决定。
pub struct MockRegistry {
    inner: MemoryRegistry,
    config: MockRegistryConfig,
    list_calls: AtomicUsize,
    /// 每次 delete 调用的参数 (含失败的调用)
    delete_calls: Mutex<Vec<RecipientId>>,
}

impl MockRegistry {
    /// 使用默认配置创建
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RecipientId>,
    {
        Self::with_config(ids, MockRegistryConfig::default())
    }

    /// 使用配置创建
    pub fn with_config<I, S>(ids: I, config: MockRegistryConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RecipientId>,
    {
        Self {
            inner: MemoryRegistry::with_seed(ids),
            config,
            list_calls: AtomicUsize::new(0),
            delete_calls: Mutex::new(Vec::new()),
        }
    }

    /// list() 调用次数
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// delete() 调用记录
    pub fn delete_calls(&self) -> Vec<RecipientId> {
        self.delete_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// 针对某个 ID 的 delete() 次数
    pub fn delete_count(&self, id: &str) -> usize {
        self.delete_calls().iter().filter(|d| *d == id).count()
    }

    /// 当前仍注册的连接
    pub async fn contains(&self, id: &str) -> bool {
        self.inner.contains(id).await
    }
}

impl ConnectionRegistry for MockRegistry {
    #[instrument(name = "mock_registry_list", skip(self))]
    async fn list(&self) -> Result<Vec<RecipientId>, RegistryError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_list {
            return Err(RegistryError::unavailable("mock list failure"));
        }
        self.inner.list().await
    }

    async fn put(&self, record: ConnectionRecord) -> Result<(), RegistryError> {
        if self.config.fail_put {
            return Err(RegistryError::unavailable("mock put failure"));
        }
        self.inner.put(record).await
    }

    #[instrument(name = "mock_registry_delete", skip(self), fields(connection = %id))]
    async fn delete(&self, id: &RecipientId) -> Result<(), RegistryError> {
        self.delete_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id.clone());

        if let Some(delay) = self.config.delete_delay {
            tokio::time::sleep(delay).await;
        }
        if self.config.fail_delete.iter().any(|f| id == f) {
            return Err(RegistryError::unavailable(format!(
                "mock delete failure for '{id}'"
            )));
        }
        self.inner.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_delete_calls() {
        let registry = MockRegistry::with_config(
            ["a", "b"],
            MockRegistryConfig {
                fail_delete: vec!["b".to_string()],
                ..Default::default()
            },
        );

        assert!(registry.delete(&"a".into()).await.is_ok());
        assert!(registry.delete(&"b".into()).await.is_err());

        assert_eq!(registry.delete_count("a"), 1);
        assert_eq!(registry.delete_count("b"), 1);
        assert!(!registry.contains("a").await);
        assert!(registry.contains("b").await);
    }
}
