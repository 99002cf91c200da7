//! 结构化调用事件
//!
//! 调用结束时构建一条 `RpcCallEvent` 交给外部发布者，每个调用恰好一次，
//! 从不发布中间状态。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use super::{CallSink, CallSummary};
use crate::error::{Result, RpcLogError};
use crate::handler::CallDetails;
use crate::proto::{RequestMetadata, RpcStatus};
use crate::types::{CallId, CallIdentity, Outcome};

/// 单次调用的结构化事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcCallEvent {
    pub call_id: CallId,
    pub method_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RequestMetadata>,
    pub status: RpcStatus,
    /// 方法没有注册处理器时为 `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CallDetails>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl RpcCallEvent {
    pub fn new(
        call: &CallIdentity,
        metadata: Option<RequestMetadata>,
        outcome: &Outcome,
        details: Option<CallDetails>,
    ) -> Self {
        Self {
            call_id: call.id,
            method_name: call.method_name.clone(),
            metadata,
            status: outcome.to_rpc_status(),
            details,
            timestamp: Utc::now(),
        }
    }

    /// 从调用汇总构建事件
    pub fn from_summary(call: &CallIdentity, summary: &CallSummary<'_>) -> Self {
        Self::new(
            call,
            summary.metadata.cloned(),
            summary.outcome,
            summary.details.cloned(),
        )
    }

    pub fn status_code(&self) -> i32 {
        self.status.code
    }

    pub fn status_message(&self) -> &str {
        &self.status.message
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// 外部事件发布者
pub trait EventPublisher: Send + Sync {
    fn post(&self, event: RpcCallEvent) -> Result<()>;
}

impl EventPublisher for mpsc::UnboundedSender<RpcCallEvent> {
    fn post(&self, event: RpcCallEvent) -> Result<()> {
        self.send(event)
            .map_err(|_| RpcLogError::publish("event receiver dropped"))
    }
}

impl EventPublisher for broadcast::Sender<RpcCallEvent> {
    fn post(&self, event: RpcCallEvent) -> Result<()> {
        self.send(event)
            .map(|_| ())
            .map_err(|_| RpcLogError::publish("no active event subscribers"))
    }
}

impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    fn post(&self, event: RpcCallEvent) -> Result<()> {
        (**self).post(event)
    }
}

/// 在调用结束时发布结构化事件的 Sink
pub struct EventEmitter {
    publisher: Arc<dyn EventPublisher>,
}

impl EventEmitter {
    pub fn new(publisher: impl EventPublisher + 'static) -> Self {
        Self {
            publisher: Arc::new(publisher),
        }
    }

    pub fn from_arc(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

impl CallSink for EventEmitter {
    fn call_finished(&self, call: &CallIdentity, summary: &CallSummary<'_>) {
        let event = RpcCallEvent::from_summary(call, summary);
        if let Err(e) = self.publisher.post(event) {
            warn!(
                call_id = %call.id,
                method = %call.method_name,
                error = %e,
                "Failed to publish rpc call event"
            );
        }
    }
}
