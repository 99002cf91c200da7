//! 客户端调用模型
//!
//! 传输层以回调形式交付调用生命周期：`start` 注册监听器，之后按顺序收到
//! 消息通知，最后收到一次关闭通知。拦截器通过包装 `ClientCall` 与
//! `CallListener` 观察整个生命周期，而不需要知道具体的消息类型。

use std::fmt;

use tonic::Status;
use tonic::metadata::MetadataMap;

/// 调用中流转的消息类型约束
///
/// `Debug` 用于日志渲染，`'static` 使处理器可以按具体类型向下转型。
pub trait CallMessage: fmt::Debug + Send + 'static {}

impl<T> CallMessage for T where T: fmt::Debug + Send + 'static {}

/// 方法形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
}

/// 方法描述
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    full_name: String,
    kind: MethodKind,
}

impl MethodDescriptor {
    /// `full_name` 形如 `package.Service/Method`
    pub fn new(full_name: impl Into<String>, kind: MethodKind) -> Self {
        Self {
            full_name: full_name.into(),
            kind,
        }
    }

    pub fn unary(full_name: impl Into<String>) -> Self {
        Self::new(full_name, MethodKind::Unary)
    }

    pub fn server_streaming(full_name: impl Into<String>) -> Self {
        Self::new(full_name, MethodKind::ServerStreaming)
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    /// 服务名（最后一个 `/` 之前的部分）
    pub fn service(&self) -> Option<&str> {
        self.full_name
            .rsplit_once('/')
            .map(|(service, _)| service.trim_start_matches('/'))
    }

    /// 方法名（最后一个 `/` 之后的部分）
    pub fn method(&self) -> &str {
        self.full_name
            .rsplit_once('/')
            .map(|(_, method)| method)
            .unwrap_or(&self.full_name)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// 响应监听器，由传输层按顺序回调
pub trait CallListener<Resp>: Send {
    fn on_headers(&mut self, _headers: MetadataMap) {}

    fn on_message(&mut self, message: Resp);

    fn on_close(&mut self, status: Status, trailers: MetadataMap);
}

/// 一次客户端调用
pub trait ClientCall<Req, Resp>: Send {
    fn start(&mut self, listener: Box<dyn CallListener<Resp>>, headers: MetadataMap);

    fn send_message(&mut self, message: Req);

    fn half_close(&mut self);

    fn cancel(&mut self, message: Option<String>, cause: Option<Status>);
}

/// 发起调用的能力
pub trait Channel: Send + Sync {
    fn new_call<Req, Resp>(&self, method: &MethodDescriptor) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: CallMessage,
        Resp: CallMessage;
}

/// 客户端拦截器：包装下游通道发起的调用
pub trait ClientInterceptor: Send + Sync {
    fn intercept_call<Req, Resp, C>(
        &self,
        method: &MethodDescriptor,
        next: &C,
    ) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: CallMessage,
        Resp: CallMessage,
        C: Channel;
}

/// 挂载了拦截器的通道
pub struct InterceptedChannel<C, I> {
    inner: C,
    interceptor: I,
}

impl<C, I> InterceptedChannel<C, I> {
    pub fn new(inner: C, interceptor: I) -> Self {
        Self { inner, interceptor }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn interceptor(&self) -> &I {
        &self.interceptor
    }
}

impl<C, I> Channel for InterceptedChannel<C, I>
where
    C: Channel,
    I: ClientInterceptor,
{
    fn new_call<Req, Resp>(&self, method: &MethodDescriptor) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: CallMessage,
        Resp: CallMessage,
    {
        self.interceptor.intercept_call(method, &self.inner)
    }
}

/// 通道扩展：按顺序叠加拦截器，最后叠加的最先看到调用
pub trait ChannelExt: Channel + Sized {
    fn with_interceptor<I: ClientInterceptor>(self, interceptor: I) -> InterceptedChannel<Self, I> {
        InterceptedChannel::new(self, interceptor)
    }
}

impl<C: Channel> ChannelExt for C {}

impl<T: Channel + ?Sized> Channel for std::sync::Arc<T> {
    fn new_call<Req, Resp>(&self, method: &MethodDescriptor) -> Box<dyn ClientCall<Req, Resp>>
    where
        Req: CallMessage,
        Resp: CallMessage,
    {
        (**self).new_call(method)
    }
}

impl<T: ClientInterceptor + ?Sized> ClientInterceptor for std::sync::Arc<T> {
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
        (**self).intercept_call(method, next)
    }
}
