//! gRPC 状态渲染
//!
//! 日志行和结构化事件共用同一套 `tonic::Status` 文本表示。

use std::error::Error as _;

use tonic::Status;

/// 渲染关闭状态，形如 `code=NotFound, description=error`
pub fn describe_status(status: &Status) -> String {
    let mut rendered = format!("code={:?}", status.code());
    if !status.message().is_empty() {
        rendered.push_str(", description=");
        rendered.push_str(status.message());
    }
    if let Some(source) = status.source() {
        rendered.push_str(", cause=");
        rendered.push_str(&source.to_string());
    }
    rendered
}

/// 渲染作为取消原因的故障，形如 `NotFound: error`
pub fn describe_cause(cause: &Status) -> String {
    if cause.message().is_empty() {
        format!("{:?}", cause.code())
    } else {
        format!("{:?}: {}", cause.code(), cause.message())
    }
}

/// 结构化事件中的状态消息：优先使用底层故障，其次使用描述
pub fn status_message(status: &Status) -> String {
    match status.source() {
        Some(source) => source.to_string(),
        None => status.message().to_string(),
    }
}
