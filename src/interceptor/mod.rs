//! 客户端调用拦截器模块
//!
//! 提供调用日志拦截器以及组合 Sink

pub mod composite;
pub mod logging;

pub use composite::CompositeSink;
pub use logging::{LoggingInterceptor, LoggingInterceptorBuilder};
