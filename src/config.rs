use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// RPC 调用日志配置
///
/// ```toml
/// name = "remote"
/// log_data = false
/// emit_events = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RpcLogConfig {
    /// 日志行前缀中的名称
    #[serde(default = "default_logger_name")]
    pub name: String,
    /// 是否记录消息 / 元数据内容
    #[serde(default = "default_true")]
    pub log_data: bool,
    /// 是否在调用结束时发布结构化事件
    #[serde(default = "default_true")]
    pub emit_events: bool,
}

fn default_logger_name() -> String {
    "rpc".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RpcLogConfig {
    fn default() -> Self {
        Self {
            name: default_logger_name(),
            log_data: true,
            emit_events: true,
        }
    }
}

impl RpcLogConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
