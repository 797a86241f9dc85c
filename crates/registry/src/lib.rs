//! # Registry
//!
//! 连接注册表模块。
//!
//! 负责：
//! - 每次广播读取一次连接快照 (`SnapshotReader`)
//! - 进程内注册表 (`MemoryRegistry`) 与 JSON 文件注册表 (`FileRegistry`)
//! - 可注入失败的 `MockRegistry`，用于测试

pub mod error;
pub mod file;
pub mod memory;
pub mod mock;
pub mod snapshot;

pub use contracts::{ConnectionRecord, ConnectionRegistry, RegistrySnapshot};
pub use error::SnapshotError;
pub use file::FileRegistry;
pub use memory::MemoryRegistry;
pub use mock::{MockRegistry, MockRegistryConfig};
pub use snapshot::SnapshotReader;
