//! 按方法累积调用详情的处理器
//!
//! 每个被监控的方法对应一种处理器。处理器只属于单个调用，按顺序接收该调用的
//! 请求与响应，调用结束时恰好被消费一次，产出 `CallDetails`。

pub mod execute;
pub mod registry;
pub mod watch;

pub use execute::ExecuteHandler;
pub use registry::{EXECUTE_METHOD, HandlerFactory, HandlerRegistry, WATCH_METHOD};
pub use watch::WatchHandler;

use std::any::{Any, type_name};
use std::marker::PhantomData;

use serde::Serialize;
use tracing::warn;

use crate::proto::{ChangeBatch, ExecuteRequest, Operation, WatchRequest};

/// `Execute` 调用详情
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecuteDetails {
    pub request: Option<ExecuteRequest>,
    pub operation: Option<Operation>,
}

/// `Watch` 调用详情
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WatchDetails {
    pub request: Option<WatchRequest>,
    pub change_batches: Vec<ChangeBatch>,
}

/// 调用详情，每种被监控的方法一个变体
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDetails {
    Execute(ExecuteDetails),
    Watch(WatchDetails),
}

/// 强类型处理器
///
/// `into_details` 消费处理器本身，详情只能读取一次。
pub trait CallHandler: Send + 'static {
    type Request: 'static;
    type Response: 'static;

    fn handle_request(&mut self, message: &Self::Request);

    fn handle_response(&mut self, message: &Self::Response);

    fn into_details(self) -> CallDetails;
}

/// 类型擦除后的处理器，拦截器只通过它与处理器交互
pub trait LoggingHandler: Send {
    fn handle_request(&mut self, message: &dyn Any);

    fn handle_response(&mut self, message: &dyn Any);

    fn finish(self: Box<Self>) -> CallDetails;
}

/// 把 `CallHandler` 适配为 `LoggingHandler`
///
/// 消息类型与处理器声明的类型不一致时跳过该消息。
pub struct TypedHandler<H> {
    inner: H,
    _marker: PhantomData<fn() -> H>,
}

impl<H: CallHandler> TypedHandler<H> {
    pub fn new(inner: H) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn boxed(inner: H) -> Box<dyn LoggingHandler> {
        Box::new(Self::new(inner))
    }
}

impl<H: CallHandler> LoggingHandler for TypedHandler<H> {
    fn handle_request(&mut self, message: &dyn Any) {
        match message.downcast_ref::<H::Request>() {
            Some(message) => self.inner.handle_request(message),
            None => warn!(
                handler = type_name::<H>(),
                expected = type_name::<H::Request>(),
                "Request type mismatch, message not recorded"
            ),
        }
    }

    fn handle_response(&mut self, message: &dyn Any) {
        match message.downcast_ref::<H::Response>() {
            Some(message) => self.inner.handle_response(message),
            None => warn!(
                handler = type_name::<H>(),
                expected = type_name::<H::Response>(),
                "Response type mismatch, message not recorded"
            ),
        }
    }

    fn finish(self: Box<Self>) -> CallDetails {
        self.inner.into_details()
    }
}
