//! GatewayConfig - Config Loader 输出
//!
//! 描述网关配置：分发并发度、清理策略、连接注册表后端、传输队列。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的网关配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewayConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 网关标识
    #[validate(nested)]
    pub gateway: GatewaySettings,

    /// 分发器设置
    #[serde(default)]
    #[validate(nested)]
    pub dispatcher: DispatcherSettings,

    /// 连接注册表设置
    #[serde(default)]
    pub registry: RegistrySettings,

    /// 传输设置
    #[serde(default)]
    #[validate(nested)]
    pub transport: TransportSettings,
}

/// 网关标识：名称、stage
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GatewaySettings {
    /// API 名称 (e.g., "chat-app-api")
    #[validate(length(min = 1, message = "gateway name cannot be empty"))]
    pub name: String,

    /// 部署 stage
    #[serde(default = "default_stage")]
    pub stage: String,
}

fn default_stage() -> String {
    "production".to_string()
}

/// 分发器设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatcherSettings {
    /// 同时在途的投递上限
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1, message = "max_concurrency must be >= 1"))]
    pub max_concurrency: usize,

    /// 失效连接清理策略
    #[serde(default)]
    pub cleanup: CleanupMode,

    /// 单次投递超时 (毫秒)，None = 不限
    #[serde(default)]
    #[validate(range(min = 1, message = "send_timeout_ms must be > 0"))]
    pub send_timeout_ms: Option<u64>,

    /// 整次广播超时 (毫秒)，None = 不限
    #[serde(default)]
    #[validate(range(min = 1, message = "broadcast_timeout_ms must be > 0"))]
    pub broadcast_timeout_ms: Option<u64>,
}

fn default_max_concurrency() -> usize {
    20
}

impl DispatcherSettings {
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_ms.map(Duration::from_millis)
    }

    pub fn broadcast_timeout(&self) -> Option<Duration> {
        self.broadcast_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            cleanup: CleanupMode::default(),
            send_timeout_ms: None,
            broadcast_timeout_ms: None,
        }
    }
}

/// 失效连接清理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// 后台删除，不阻塞广播结果
    #[default]
    Async,
    /// 在投递任务内等待删除完成
    Sync,
    /// 只记录，不删除
    Disabled,
}

/// 注册表后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryBackend {
    /// 进程内 HashMap
    #[default]
    Memory,
    /// JSON 文件
    File,
}

/// 连接注册表设置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// 后端类型
    #[serde(default)]
    pub backend: RegistryBackend,

    /// 文件路径 (file 后端必填)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// 启动时预注册的连接
    #[serde(default)]
    pub seed: Vec<String>,
}

/// 传输设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransportSettings {
    /// 每个连接的进程内队列容量
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1, message = "queue_capacity must be >= 1"))]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}
