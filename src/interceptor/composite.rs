use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::proto::RequestMetadata;
use crate::sink::{CallSink, CallSummary, EventEmitter, EventPublisher, RpcLogger};
use crate::types::{CallIdentity, CancelReason};

/// 组合 Sink：按添加顺序把通知分发给每个成员
///
/// 成员 panic 只丢失它自己的这条通知，后续成员照常收到。
#[derive(Clone, Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn CallSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_line_logger(self, logger: Arc<RpcLogger>) -> Self {
        self.with_sink(logger)
    }

    pub fn with_event_emitter(self, publisher: impl EventPublisher + 'static) -> Self {
        self.with_sink(Arc::new(EventEmitter::new(publisher)))
    }

    pub fn with_sink(mut self, sink: Arc<dyn CallSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for CompositeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl CompositeSink {
    fn each(&self, call: &CallIdentity, hook: &'static str, f: impl Fn(&dyn CallSink)) {
        for (index, sink) in self.sinks.iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| f(sink.as_ref()))).is_err() {
                error!(
                    call_id = %call.id,
                    method = %call.method_name,
                    hook,
                    sink = index,
                    "Call sink panicked, notification dropped for this sink"
                );
            }
        }
    }
}

impl CallSink for CompositeSink {
    fn call_started(&self, call: &CallIdentity, metadata: Option<&RequestMetadata>) {
        self.each(call, "call_started", |sink| sink.call_started(call, metadata));
    }

    fn request_sent(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        self.each(call, "request_sent", |sink| sink.request_sent(call, message));
    }

    fn response_received(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        self.each(call, "response_received", |sink| {
            sink.response_received(call, message)
        });
    }

    fn call_finished(&self, call: &CallIdentity, summary: &CallSummary<'_>) {
        self.each(call, "call_finished", |sink| sink.call_finished(call, summary));
    }

    fn cancel_after_finish(&self, call: &CallIdentity, reason: &CancelReason) {
        self.each(call, "cancel_after_finish", |sink| {
            sink.cancel_after_finish(call, reason)
        });
    }
}
