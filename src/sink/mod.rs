//! 调用生命周期通知的消费者
//!
//! - `RpcLogger`：每个通知写一行可读日志
//! - `EventEmitter`：调用结束时发布一条结构化事件

pub mod event;
pub mod line_logger;

pub use event::{EventEmitter, EventPublisher, RpcCallEvent};
pub use line_logger::RpcLogger;

use std::fmt;

use crate::handler::CallDetails;
use crate::proto::RequestMetadata;
use crate::types::{CallIdentity, CancelReason, Outcome};

/// 调用结束时交给 Sink 的汇总信息
#[derive(Debug, Clone, Copy)]
pub struct CallSummary<'a> {
    pub metadata: Option<&'a RequestMetadata>,
    pub outcome: &'a Outcome,
    /// 方法没有注册处理器时为 `None`
    pub details: Option<&'a CallDetails>,
}

/// 生命周期通知消费者
///
/// 对同一个调用，通知顺序为：`call_started` -> 若干 `request_sent` /
/// `response_received` -> 恰好一次 `call_finished`。实现必须自行吞掉内部错误。
pub trait CallSink: Send + Sync {
    fn call_started(&self, _call: &CallIdentity, _metadata: Option<&RequestMetadata>) {}

    fn request_sent(&self, _call: &CallIdentity, _message: &dyn fmt::Debug) {}

    fn response_received(&self, _call: &CallIdentity, _message: &dyn fmt::Debug) {}

    fn call_finished(&self, _call: &CallIdentity, _summary: &CallSummary<'_>) {}

    /// 调用已经结束后，调用方又发出了取消（例如客户端把远端错误转为本地故障）
    fn cancel_after_finish(&self, _call: &CallIdentity, _reason: &CancelReason) {}
}

impl<T: CallSink + ?Sized> CallSink for std::sync::Arc<T> {
    fn call_started(&self, call: &CallIdentity, metadata: Option<&RequestMetadata>) {
        (**self).call_started(call, metadata)
    }

    fn request_sent(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        (**self).request_sent(call, message)
    }

    fn response_received(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        (**self).response_received(call, message)
    }

    fn call_finished(&self, call: &CallIdentity, summary: &CallSummary<'_>) {
        (**self).call_finished(call, summary)
    }

    fn cancel_after_finish(&self, call: &CallIdentity, reason: &CancelReason) {
        (**self).cancel_after_finish(call, reason)
    }
}
