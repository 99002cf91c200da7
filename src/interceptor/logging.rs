use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tonic::Status;
use tonic::metadata::MetadataMap;
use tracing::{debug, error};

use super::composite::CompositeSink;
use crate::call::{
    CallListener, CallMessage, Channel, ClientCall, ClientInterceptor, MethodDescriptor,
};
use crate::config::RpcLogConfig;
use crate::handler::{HandlerRegistry, LoggingHandler};
use crate::metadata::extract_request_metadata;
use crate::proto::RequestMetadata;
use crate::sink::{CallSink, CallSummary, EventEmitter, EventPublisher, RpcLogger};
use crate::types::{CallIdentity, CancelReason, Outcome};

/// 日志拦截器
///
/// 为每个调用分配身份、提取请求元数据、按方法选择处理器，并把生命周期通知
/// 交给 Sink。消息和终止信号在通知之后原样转发，插桩不会改变调用结果。
#[derive(Clone)]
pub struct LoggingInterceptor {
    sink: Arc<dyn CallSink>,
    registry: Arc<HandlerRegistry>,
}

impl LoggingInterceptor {
    pub fn new(sink: impl CallSink + 'static, registry: HandlerRegistry) -> Self {
        Self {
            sink: Arc::new(sink),
            registry: Arc::new(registry),
        }
    }

    pub fn builder() -> LoggingInterceptorBuilder {
        LoggingInterceptorBuilder::new()
    }

    /// 按配置组装：总是挂载行日志，`emit_events` 且提供了发布者时挂载事件发布
    pub fn from_config(
        config: &RpcLogConfig,
        output: impl Write + Send + 'static,
        publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Self {
        let logger = RpcLogger::new(config.name.clone(), output).log_data(config.log_data);
        let mut builder = Self::builder().with_line_logger(Arc::new(logger));
        if let Some(publisher) = publisher.filter(|_| config.emit_events) {
            builder = builder.with_sink(Arc::new(EventEmitter::from_arc(publisher)));
        }
        builder.build()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }
}

impl ClientInterceptor for LoggingInterceptor {
    fn intercept_call<Req, Resp, C>(
        &self,
        method: &MethodDescriptor,
        next: &C,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: CallMessage,
        Resp: CallMessage,
        C: Channel,
    {
        let delegate = next.new_call::<Req, Resp>(method);
        let state = CallState {
            identity: CallIdentity::new(method.full_name()),
            method: method.clone(),
            sink: Arc::clone(&self.sink),
            registry: Arc::clone(&self.registry),
            metadata: OnceLock::new(),
            handler: Mutex::new(HandlerSlot::Idle),
            finished: AtomicBool::new(false),
        };
        Box::new(LoggingCall {
            delegate,
            state: Arc::new(state),
        })
    }
}

/// `LoggingInterceptor` 构建器
#[derive(Default)]
pub struct LoggingInterceptorBuilder {
    sinks: CompositeSink,
    registry: Option<HandlerRegistry>,
}

impl LoggingInterceptorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_logger(mut self, logger: Arc<RpcLogger>) -> Self {
        self.sinks = self.sinks.with_line_logger(logger);
        self
    }

    pub fn with_event_emitter(mut self, publisher: impl EventPublisher + 'static) -> Self {
        self.sinks = self.sinks.with_event_emitter(publisher);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn CallSink>) -> Self {
        self.sinks = self.sinks.with_sink(sink);
        self
    }

    /// 未指定时使用内置处理器注册表
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> LoggingInterceptor {
        LoggingInterceptor::new(self.sinks, self.registry.unwrap_or_default())
    }
}

enum HandlerSlot {
    /// 调用尚未开始
    Idle,
    /// 方法没有注册处理器
    Unmonitored,
    Accumulating(Box<dyn LoggingHandler>),
    /// 详情已被读取
    Finished,
}

/// 单个调用的插桩状态，由转发调用与转发监听器共享
struct CallState {
    identity: CallIdentity,
    method: MethodDescriptor,
    sink: Arc<dyn CallSink>,
    registry: Arc<HandlerRegistry>,
    metadata: OnceLock<Option<RequestMetadata>>,
    handler: Mutex<HandlerSlot>,
    finished: AtomicBool,
}

impl CallState {
    fn start(&self, headers: &MetadataMap) {
        let metadata = self.metadata.get_or_init(|| extract_request_metadata(headers));

        {
            let mut slot = self.handler.lock();
            if matches!(*slot, HandlerSlot::Idle) {
                *slot = match self.registry.select(&self.method) {
                    Some(handler) => HandlerSlot::Accumulating(handler),
                    None => HandlerSlot::Unmonitored,
                };
            }
        }

        debug!(
            call_id = %self.identity.id,
            method = %self.identity.method_name,
            has_metadata = metadata.is_some(),
            "Client call started"
        );
        self.contain("call_started", || {
            self.sink.call_started(&self.identity, metadata.as_ref())
        });
    }

    fn record_request(&self, message: &dyn Any, rendered: &dyn std::fmt::Debug) {
        let mut slot = self.handler.lock();
        if self.is_finished() {
            return;
        }
        self.contain("handle_request", || {
            if let HandlerSlot::Accumulating(handler) = &mut *slot {
                handler.handle_request(message);
            }
        });
        self.contain("request_sent", || {
            self.sink.request_sent(&self.identity, rendered)
        });
    }

    fn record_response(&self, message: &dyn Any, rendered: &dyn std::fmt::Debug) {
        // 持锁到通知完成，终止通知只能排在其后
        let mut slot = self.handler.lock();
        if self.is_finished() {
            return;
        }
        self.contain("handle_response", || {
            if let HandlerSlot::Accumulating(handler) = &mut *slot {
                handler.handle_response(message);
            }
        });
        self.contain("response_received", || {
            self.sink.response_received(&self.identity, rendered)
        });
    }

    /// 处理终止信号；只有第一次调用生效，返回是否生效
    fn finish(&self, outcome: Outcome) -> bool {
        if self.finished.swap(true, Ordering::AcqRel) {
            return false;
        }

        let slot = std::mem::replace(&mut *self.handler.lock(), HandlerSlot::Finished);
        let details = match slot {
            HandlerSlot::Accumulating(handler) => {
                panic::catch_unwind(AssertUnwindSafe(|| handler.finish())).ok()
            }
            HandlerSlot::Idle | HandlerSlot::Unmonitored | HandlerSlot::Finished => None,
        };

        debug!(
            call_id = %self.identity.id,
            method = %self.identity.method_name,
            code = ?outcome.code(),
            "Client call finished"
        );
        let summary = CallSummary {
            metadata: self.metadata(),
            outcome: &outcome,
            details: details.as_ref(),
        };
        self.contain("call_finished", || {
            self.sink.call_finished(&self.identity, &summary)
        });
        true
    }

    /// 调用已结束时，取消只作为附加通知交给 Sink
    fn cancel(&self, reason: CancelReason) {
        if !self.finish(Outcome::Cancelled(reason.clone())) {
            self.contain("cancel_after_finish", || {
                self.sink.cancel_after_finish(&self.identity, &reason)
            });
        }
    }

    fn metadata(&self) -> Option<&RequestMetadata> {
        self.metadata.get().and_then(Option::as_ref)
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// 插桩内部的 panic 不能传到调用路径上
    fn contain(&self, hook: &'static str, f: impl FnOnce()) {
        if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
            error!(
                call_id = %self.identity.id,
                method = %self.identity.method_name,
                hook,
                "Call instrumentation panicked, notification dropped"
            );
        }
    }
}

/// 转发调用：先通知，再原样转发
struct LoggingCall<Req, Resp> {
    delegate: Box<dyn ClientCall<Req, Resp>>,
    state: Arc<CallState>,
}

impl<Req, Resp> ClientCall<Req, Resp> for LoggingCall<Req, Resp>
where
    Req: CallMessage,
    Resp: CallMessage,
{
    fn start(&mut self, listener: Box<dyn CallListener<Resp>>, headers: MetadataMap) {
        self.state.start(&headers);
        let listener = LoggingListener {
            inner: listener,
            state: Arc::clone(&self.state),
        };
        self.delegate.start(Box::new(listener), headers);
    }

    fn send_message(&mut self, message: Req) {
        self.state.record_request(&message, &message);
        self.delegate.send_message(message);
    }

    fn half_close(&mut self) {
        self.delegate.half_close();
    }

    fn cancel(&mut self, message: Option<String>, cause: Option<Status>) {
        self.state
            .cancel(CancelReason::new(message.clone(), cause.clone()));
        self.delegate.cancel(message, cause);
    }
}

/// 转发监听器
struct LoggingListener<Resp> {
    inner: Box<dyn CallListener<Resp>>,
    state: Arc<CallState>,
}

impl<Resp> CallListener<Resp> for LoggingListener<Resp>
where
    Resp: CallMessage,
{
    fn on_headers(&mut self, headers: MetadataMap) {
        self.inner.on_headers(headers);
    }

    fn on_message(&mut self, message: Resp) {
        self.state.record_response(&message, &message);
        self.inner.on_message(message);
    }

    fn on_close(&mut self, status: Status, trailers: MetadataMap) {
        self.state.finish(Outcome::Closed(status.clone()));
        self.inner.on_close(status, trailers);
    }
}
