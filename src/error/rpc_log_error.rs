//! RPC 日志统一错误类型

use thiserror::Error;

/// RPC 日志插桩层错误
#[derive(Error, Debug)]
pub enum RpcLogError {
    /// 输出目标写入失败
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 请求元数据头存在但无法读取
    #[error("Invalid request metadata: {0}")]
    Metadata(String),

    /// protobuf 解码失败
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// 配置解析失败
    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    /// 事件发布失败
    #[error("Failed to publish event: {0}")]
    Publish(String),

    /// 事件序列化失败
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl RpcLogError {
    /// 创建元数据错误
    pub fn metadata(msg: impl Into<String>) -> Self {
        RpcLogError::Metadata(msg.into())
    }

    /// 创建事件发布错误
    pub fn publish(msg: impl Into<String>) -> Self {
        RpcLogError::Publish(msg.into())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RpcLogError>;
