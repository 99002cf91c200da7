//! Flare RPC Logging
//!
//! 客户端 RPC 调用插桩：为每个调用分配身份、提取请求元数据、按方法累积调用详情，
//! 并把调用生命周期交给可读日志与结构化事件两类消费者。

pub mod call;
pub mod config;
pub mod error;
pub mod handler;
pub mod interceptor;
pub mod metadata;
pub mod proto;
pub mod sink;
pub mod types;

// Re-exports
pub use call::{
    CallListener, CallMessage, Channel, ChannelExt, ClientCall, ClientInterceptor,
    InterceptedChannel, MethodDescriptor, MethodKind,
};
pub use config::RpcLogConfig;
pub use error::{Result, RpcLogError};
pub use handler::{
    CallDetails, CallHandler, ExecuteDetails, ExecuteHandler, HandlerRegistry, LoggingHandler,
    TypedHandler, WatchDetails, WatchHandler,
};
pub use interceptor::{CompositeSink, LoggingInterceptor, LoggingInterceptorBuilder};
pub use metadata::{
    REQUEST_METADATA_KEY, RequestMetadataInjector, attach_request_metadata,
    extract_request_metadata, try_extract_request_metadata,
};
pub use sink::{CallSink, CallSummary, EventEmitter, EventPublisher, RpcCallEvent, RpcLogger};
pub use types::{CallId, CallIdentity, CancelReason, Outcome};
