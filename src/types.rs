use std::fmt;

use serde::{Deserialize, Serialize};
use tonic::{Code, Status};
use uuid::Uuid;

use crate::error::{describe_cause, status_message};
use crate::proto::RpcStatus;

/// 调用 ID，进程内唯一（随机 v4 UUID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(Uuid);

impl CallId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 调用身份：调用开始时生成一次，之后不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallIdentity {
    pub id: CallId,
    pub method_name: String,
}

impl CallIdentity {
    /// 为指定方法生成新的调用身份
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            id: CallId::new(),
            method_name: method_name.into(),
        }
    }

    pub fn with_id(id: CallId, method_name: impl Into<String>) -> Self {
        Self {
            id,
            method_name: method_name.into(),
        }
    }
}

/// 取消原因：显式消息、导致取消的故障，或两者皆无
#[derive(Debug, Clone, Default)]
pub struct CancelReason {
    pub message: Option<String>,
    pub cause: Option<Status>,
}

impl CancelReason {
    pub fn new(message: Option<String>, cause: Option<Status>) -> Self {
        Self { message, cause }
    }

    /// 两者皆无时为 `None`（裸取消）
    pub fn describe(&self) -> Option<String> {
        match (&self.message, &self.cause) {
            (Some(message), _) => Some(message.clone()),
            (None, Some(cause)) => Some(describe_cause(cause)),
            (None, None) => None,
        }
    }
}

/// 调用结局，每个调用恰好产生一次
#[derive(Debug, Clone)]
pub enum Outcome {
    /// 传输层以状态关闭调用
    Closed(Status),
    /// 调用方取消
    Cancelled(CancelReason),
}

impl Outcome {
    pub fn code(&self) -> Code {
        match self {
            Outcome::Closed(status) => status.code(),
            Outcome::Cancelled(_) => Code::Cancelled,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }

    /// 转换为 `google.rpc.Status` 形式
    pub fn to_rpc_status(&self) -> RpcStatus {
        match self {
            Outcome::Closed(status) => RpcStatus {
                code: status.code() as i32,
                message: status_message(status),
            },
            Outcome::Cancelled(reason) => RpcStatus {
                code: Code::Cancelled as i32,
                message: reason.describe().unwrap_or_default(),
            },
        }
    }
}
