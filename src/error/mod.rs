//! 错误处理模块
//!
//! 插桩层内部错误统一为 `RpcLogError`。这些错误只在插桩层内部流转，
//! 由各个 Sink 记录后吞掉，绝不会影响被拦截的 RPC 调用本身。

pub mod rpc_log_error;
pub mod status;

pub use rpc_log_error::{Result, RpcLogError};
pub use status::{describe_cause, describe_status, status_message};
