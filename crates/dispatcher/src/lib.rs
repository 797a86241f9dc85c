//! # Dispatcher
//!
//! 广播分发模块。
//!
//! 负责：
//! - 将一条消息 fan-out 到快照中除发送者外的所有连接
//! - 用 semaphore 限制同时进行的发送数量
//! - 把每个连接的结果分类为 delivered / transient / stale
//! - 对 stale 连接发起一次尽力而为的注册表删除

pub mod cleanup;
pub mod dispatcher;
pub mod error;
pub mod metrics;

#[cfg(test)]
mod property_tests;

pub use cleanup::StaleCleaner;
pub use contracts::{BroadcastResult, DeliveryOutcome, DeliveryStatus, Message, RegistrySnapshot};
pub use dispatcher::{DispatcherConfig, FanoutDispatcher};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, InFlightGuard, MetricsSnapshot};
pub use tokio_util::sync::CancellationToken;
