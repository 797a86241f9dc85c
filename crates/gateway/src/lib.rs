//! # Gateway
//!
//! WebSocket 网关事件处理。
//!
//! 负责：
//! - 解析入站事件 (`InboundEvent`)
//! - `$connect` / `$disconnect` 维护连接注册表
//! - `sendmessage` 读取快照并交给 dispatcher 广播
//! - 把结果映射为带状态码的 `GatewayResponse`

pub mod error;
pub mod event;
pub mod handler;
pub mod response;

pub use error::GatewayError;
pub use event::{decode_message, InboundEvent, RequestContext, Route};
pub use handler::Gateway;
pub use response::{GatewayResponse, StatusCode};
