//! 集成测试共用的进程内通道、记录型 Sink 与测试消息

#![allow(dead_code)]

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use flare_rpc_logging::{
    CallDetails, CallId, CallIdentity, CallListener, CallMessage, CallSink, CallSummary, Channel,
    ClientCall, MethodDescriptor, Outcome,
};
use flare_rpc_logging::proto::RequestMetadata;
use flare_rpc_logging::types::CancelReason;
use parking_lot::Mutex;
use tonic::metadata::MetadataMap;
use tonic::{Code, Status};

pub const GET_ACTION_RESULT: &str = "google.devtools.remoteexecution.v1test.ActionCache/GetActionResult";
pub const READ: &str = "google.bytestream.ByteStream/Read";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flare_rpc_logging=debug")
        .with_test_writer()
        .try_init();
}

// -------- 测试消息 --------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetActionResultRequest {
    #[prost(string, tag = "1")]
    pub instance_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionResult {
    #[prost(int32, tag = "4")]
    pub exit_code: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadRequest {
    #[prost(string, tag = "1")]
    pub resource_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadResponse {
    #[prost(bytes = "vec", tag = "10")]
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

// -------- 共享输出 --------

/// 可在测试中读回内容的输出目标
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).expect("log output is utf-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// 总是写入失败的输出目标
pub struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }
}

// -------- 进程内通道 --------

/// 服务端的预设应答
pub struct Reply {
    responses: Vec<Box<dyn Any + Send>>,
    status: Status,
}

impl Reply {
    pub fn ok<T: Send + 'static>(responses: Vec<T>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|r| Box::new(r) as Box<dyn Any + Send>)
                .collect(),
            status: Status::ok(""),
        }
    }

    pub fn error(status: Status) -> Self {
        Self {
            responses: Vec::new(),
            status,
        }
    }
}

/// 进程内通道：按方法取出预设应答，在 `half_close` 时同步交付
#[derive(Default)]
pub struct FakeChannel {
    replies: Mutex<HashMap<String, Vec<Reply>>>,
    seen_headers: Arc<Mutex<Vec<MetadataMap>>>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: &str, reply: Reply) -> &Self {
        self.replies
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(reply);
        self
    }

    pub fn seen_headers(&self) -> Vec<MetadataMap> {
        self.seen_headers.lock().clone()
    }
}

impl Channel for FakeChannel {
    fn new_call<Req, Resp>(&self, method: &MethodDescriptor) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: CallMessage,
        Resp: CallMessage,
    {
        let reply = {
            let mut replies = self.replies.lock();
            match replies.get_mut(method.full_name()) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Reply::error(Status::unimplemented(format!(
                    "no reply scripted for {}",
                    method
                ))),
            }
        };
        Box::new(FakeCall::<Req, Resp> {
            reply: Some(reply),
            listener: None,
            closed: false,
            seen_headers: Arc::clone(&self.seen_headers),
            _marker: PhantomData,
        })
    }
}

struct FakeCall<Req, Resp> {
    reply: Option<Reply>,
    listener: Option<Box<dyn CallListener<Resp>>>,
    closed: bool,
    seen_headers: Arc<Mutex<Vec<MetadataMap>>>,
    _marker: PhantomData<fn(Req)>,
}

impl<Req, Resp> FakeCall<Req, Resp>
where
    Resp: CallMessage,
{
    fn close(&mut self, status: Status) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(listener) = self.listener.as_mut() {
            listener.on_close(status, MetadataMap::new());
        }
    }
}

impl<Req, Resp> ClientCall<Req, Resp> for FakeCall<Req, Resp>
where
    Req: CallMessage,
    Resp: CallMessage,
{
    fn start(&mut self, listener: Box<dyn CallListener<Resp>>, headers: MetadataMap) {
        self.seen_headers.lock().push(headers);
        self.listener = Some(listener);
    }

    fn send_message(&mut self, _message: Req) {}

    fn half_close(&mut self) {
        if self.closed {
            return;
        }
        let Some(reply) = self.reply.take() else {
            return;
        };
        if let Some(listener) = self.listener.as_mut() {
            for response in reply.responses {
                let response = response
                    .downcast::<Resp>()
                    .expect("scripted response has the method's response type");
                listener.on_message(*response);
            }
        }
        self.close(reply.status);
    }

    fn cancel(&mut self, message: Option<String>, _cause: Option<Status>) {
        let message = message.unwrap_or_else(|| "call cancelled".to_string());
        self.close(Status::cancelled(message));
    }
}

/// 手动驱动的通道：不产生任何应答，把监听器交给测试在任意线程上回调
#[derive(Clone, Default)]
pub struct ManualChannel {
    listener: Arc<Mutex<Option<Box<dyn Any + Send>>>>,
}

impl ManualChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出最近一次 `start` 注册的监听器
    pub fn take_listener<Resp: CallMessage>(&self) -> Option<Box<dyn CallListener<Resp>>> {
        let listener = self.listener.lock().take()?;
        listener
            .downcast::<Box<dyn CallListener<Resp>>>()
            .ok()
            .map(|listener| *listener)
    }
}

impl Channel for ManualChannel {
    fn new_call<Req, Resp>(&self, _method: &MethodDescriptor) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: CallMessage,
        Resp: CallMessage,
    {
        Box::new(ManualCall::<Req> {
            listener: Arc::clone(&self.listener),
            _marker: PhantomData,
        })
    }
}

struct ManualCall<Req> {
    listener: Arc<Mutex<Option<Box<dyn Any + Send>>>>,
    _marker: PhantomData<fn(Req)>,
}

impl<Req, Resp> ClientCall<Req, Resp> for ManualCall<Req>
where
    Req: CallMessage,
    Resp: CallMessage,
{
    fn start(&mut self, listener: Box<dyn CallListener<Resp>>, _headers: MetadataMap) {
        let listener: Box<dyn Any + Send> = Box::new(listener);
        *self.listener.lock() = Some(listener);
    }

    fn send_message(&mut self, _message: Req) {}

    fn half_close(&mut self) {}

    fn cancel(&mut self, _message: Option<String>, _cause: Option<Status>) {}
}

// -------- 客户端辅助 --------

struct Collected<Resp> {
    messages: Vec<Resp>,
    status: Option<Status>,
}

struct CollectingListener<Resp>(Arc<Mutex<Collected<Resp>>>);

impl<Resp: CallMessage> CallListener<Resp> for CollectingListener<Resp> {
    fn on_message(&mut self, message: Resp) {
        self.0.lock().messages.push(message);
    }

    fn on_close(&mut self, status: Status, _trailers: MetadataMap) {
        self.0.lock().status = Some(status);
    }
}

/// 阻塞式调用：发送单个请求并收集全部响应。
/// 与常见客户端存根一致，远端返回错误时会以该错误为原因取消调用。
pub fn blocking_call<Req, Resp, C>(
    channel: &C,
    method: &MethodDescriptor,
    request: Req,
    headers: MetadataMap,
) -> Result<Vec<Resp>, Status>
where
    Req: CallMessage,
    Resp: CallMessage,
    C: Channel,
{
    let mut call = channel.new_call::<Req, Resp>(method);
    let collected = Arc::new(Mutex::new(Collected {
        messages: Vec::new(),
        status: None,
    }));
    call.start(Box::new(CollectingListener(Arc::clone(&collected))), headers);
    call.send_message(request);
    call.half_close();

    let (messages, status) = {
        let mut collected = collected.lock();
        (
            std::mem::take(&mut collected.messages),
            collected.status.take(),
        )
    };
    let status = status.unwrap_or_else(|| Status::internal("call did not close"));
    if status.code() == Code::Ok {
        Ok(messages)
    } else {
        call.cancel(None, Some(status.clone()));
        Err(status)
    }
}

/// 启动调用并返回调用句柄与收集到的结果，供需要手动控制生命周期的测试使用
pub fn start_call<Req, Resp, C>(
    channel: &C,
    method: &MethodDescriptor,
    headers: MetadataMap,
) -> (Box<dyn ClientCall<Req, Resp>>, CallResult<Resp>)
where
    Req: CallMessage,
    Resp: CallMessage,
    C: Channel,
{
    let mut call = channel.new_call::<Req, Resp>(method);
    let collected = Arc::new(Mutex::new(Collected {
        messages: Vec::new(),
        status: None,
    }));
    call.start(Box::new(CollectingListener(Arc::clone(&collected))), headers);
    (call, CallResult(collected))
}

pub struct CallResult<Resp>(Arc<Mutex<Collected<Resp>>>);

impl<Resp: Clone> CallResult<Resp> {
    pub fn messages(&self) -> Vec<Resp> {
        self.0.lock().messages.clone()
    }

    pub fn status(&self) -> Option<Status> {
        self.0.lock().status.clone()
    }
}

// -------- 记录型 Sink --------

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Start(Option<RequestMetadata>),
    Request(String),
    Response(String),
    Close {
        code: Code,
        description: String,
        details: Option<CallDetails>,
        metadata: Option<RequestMetadata>,
    },
    Cancel {
        message: Option<String>,
        cause: Option<(Code, String)>,
        details: Option<CallDetails>,
    },
    CancelAfterFinish {
        message: Option<String>,
        cause: Option<(Code, String)>,
    },
}

impl Recorded {
    pub fn request(message: &impl fmt::Debug) -> Self {
        Recorded::Request(format!("{:?}", message))
    }

    pub fn response(message: &impl fmt::Debug) -> Self {
        Recorded::Response(format!("{:?}", message))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Recorded::Close { .. } | Recorded::Cancel { .. })
    }
}

fn cause_of(reason: &CancelReason) -> Option<(Code, String)> {
    reason
        .cause
        .as_ref()
        .map(|status| (status.code(), status.message().to_string()))
}

/// 按顺序记录所有通知
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(CallIdentity, Recorded)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn entries(&self) -> Vec<(CallIdentity, Recorded)> {
        self.entries.lock().clone()
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.entries().into_iter().map(|(_, e)| e).collect()
    }

    pub fn events_for(&self, id: CallId) -> Vec<Recorded> {
        self.entries()
            .into_iter()
            .filter(|(call, _)| call.id == id)
            .map(|(_, e)| e)
            .collect()
    }

    fn push(&self, call: &CallIdentity, entry: Recorded) {
        self.entries.lock().push((call.clone(), entry));
    }
}

impl CallSink for RecordingSink {
    fn call_started(&self, call: &CallIdentity, metadata: Option<&RequestMetadata>) {
        self.push(call, Recorded::Start(metadata.cloned()));
    }

    fn request_sent(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        self.push(call, Recorded::Request(format!("{:?}", message)));
    }

    fn response_received(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        self.push(call, Recorded::Response(format!("{:?}", message)));
    }

    fn call_finished(&self, call: &CallIdentity, summary: &CallSummary<'_>) {
        let entry = match summary.outcome {
            Outcome::Closed(status) => Recorded::Close {
                code: status.code(),
                description: status.message().to_string(),
                details: summary.details.cloned(),
                metadata: summary.metadata.cloned(),
            },
            Outcome::Cancelled(reason) => Recorded::Cancel {
                message: reason.message.clone(),
                cause: cause_of(reason),
                details: summary.details.cloned(),
            },
        };
        self.push(call, entry);
    }

    fn cancel_after_finish(&self, call: &CallIdentity, reason: &CancelReason) {
        self.push(
            call,
            Recorded::CancelAfterFinish {
                message: reason.message.clone(),
                cause: cause_of(reason),
            },
        );
    }
}

/// 每个通知都 panic 的 Sink
pub struct PanickingSink;

impl CallSink for PanickingSink {
    fn call_started(&self, _call: &CallIdentity, _metadata: Option<&RequestMetadata>) {
        panic!("sink failure on start");
    }

    fn response_received(&self, _call: &CallIdentity, _message: &dyn fmt::Debug) {
        panic!("sink failure on response");
    }

    fn call_finished(&self, _call: &CallIdentity, _summary: &CallSummary<'_>) {
        panic!("sink failure on finish");
    }
}
