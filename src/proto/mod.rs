//! 内置处理器使用的 protobuf 消息
//!
//! 只包含日志层需要理解的字段子集，字段编号与远程执行 / watcher / longrunning
//! 协议保持一致，可以直接解码线上数据。

use serde::Serialize;

/// 远程执行请求附带的诊断元数据（通过 `*-bin` 请求头传递）
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct RequestMetadata {
    #[prost(message, optional, tag = "1")]
    pub tool_details: Option<ToolDetails>,
    #[prost(string, tag = "2")]
    pub action_id: String,
    #[prost(string, tag = "3")]
    pub tool_invocation_id: String,
    #[prost(string, tag = "4")]
    pub correlated_invocations_id: String,
}

/// 发起请求的工具信息
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct ToolDetails {
    #[prost(string, tag = "1")]
    pub tool_name: String,
    #[prost(string, tag = "2")]
    pub tool_version: String,
}

/// 内容寻址摘要
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Digest {
    #[prost(string, tag = "1")]
    pub hash: String,
    #[prost(int64, tag = "2")]
    pub size_bytes: i64,
}

/// `Execution/Execute` 请求
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct ExecuteRequest {
    #[prost(string, tag = "1")]
    pub instance_name: String,
    #[prost(bool, tag = "3")]
    pub skip_cache_lookup: bool,
    #[prost(message, optional, tag = "6")]
    pub action_digest: Option<Digest>,
}

/// 长时间运行操作（`Execute` 的响应）
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Operation {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bool, tag = "3")]
    pub done: bool,
    #[prost(message, optional, tag = "4")]
    pub error: Option<RpcStatus>,
}

/// `Watcher/Watch` 请求
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct WatchRequest {
    #[prost(string, tag = "1")]
    pub target: String,
    #[prost(bytes = "vec", tag = "2")]
    pub resume_marker: Vec<u8>,
}

/// `Watch` 流中的一批变更
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct ChangeBatch {
    #[prost(message, repeated, tag = "1")]
    pub changes: Vec<Change>,
}

/// 单个元素的变更
#[derive(Clone, PartialEq, Serialize, ::prost::Message)]
pub struct Change {
    #[prost(string, tag = "1")]
    pub element: String,
    #[prost(enumeration = "ChangeState", tag = "2")]
    pub state: i32,
    #[prost(bytes = "vec", tag = "4")]
    pub resume_marker: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub continued: bool,
}

/// 被观察元素的状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChangeState {
    Exists = 0,
    DoesNotExist = 1,
    InitialStateSkipped = 2,
    Error = 3,
}

/// `google.rpc.Status`，用于结构化事件
#[derive(Clone, PartialEq, Eq, Serialize, ::prost::Message)]
pub struct RpcStatus {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}
