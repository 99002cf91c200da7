//! 行日志
//!
//! 每条通知一行，格式为 `[<name>] <描述> [call-id: <id> method: <方法>]`，
//! 带数据时在其后追加 `:` 与换行后的数据块。多个调用共享同一个输出目标，
//! 写入和刷新在同一把锁内完成，保证行不会交错。

use std::fmt;
use std::io::Write;

use parking_lot::Mutex;
use tonic::Status;
use tracing::warn;

use super::{CallSink, CallSummary};
use crate::error::{Result, describe_status};
use crate::proto::RequestMetadata;
use crate::types::{CallId, CallIdentity, CancelReason, Outcome};

/// 可读的 RPC 调用日志
pub struct RpcLogger {
    name: String,
    log_data: bool,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl RpcLogger {
    /// 创建日志并写入启动行，默认记录消息内容
    pub fn new(name: impl Into<String>, output: impl Write + Send + 'static) -> Self {
        let logger = Self {
            name: name.into(),
            log_data: true,
            writer: Mutex::new(Box::new(output)),
        };
        if let Err(e) = logger.log("Logger started.") {
            warn!(logger = %logger.name, error = %e, "Failed to write rpc log header");
        }
        logger
    }

    /// 是否记录请求与响应消息内容；元数据和关闭状态总是记录
    #[must_use]
    pub fn log_data(mut self, log_data: bool) -> Self {
        self.log_data = log_data;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logs_data(&self) -> bool {
        self.log_data
    }

    pub fn log_start(
        &self,
        call_id: &CallId,
        method: &str,
        metadata: Option<&RequestMetadata>,
    ) -> Result<()> {
        match metadata {
            Some(metadata) => self.log_entry(
                call_id,
                method,
                "Client call started with metadata",
                Some(&format!("{:#?}", metadata)),
            ),
            None => self.log_entry(call_id, method, "Client call started", None),
        }
    }

    pub fn log_request(
        &self,
        call_id: &CallId,
        method: &str,
        message: Option<&dyn fmt::Debug>,
    ) -> Result<()> {
        let data = message.map(|m| format!("{:#?}", m));
        self.log_entry(call_id, method, "Sent message", data.as_deref())
    }

    pub fn log_response(
        &self,
        call_id: &CallId,
        method: &str,
        message: Option<&dyn fmt::Debug>,
    ) -> Result<()> {
        let data = message.map(|m| format!("{:#?}", m));
        self.log_entry(call_id, method, "Received response", data.as_deref())
    }

    pub fn log_close(&self, call_id: &CallId, method: &str, status: &Status) -> Result<()> {
        self.log_entry(
            call_id,
            method,
            "Call closed with status",
            Some(&describe_status(status)),
        )
    }

    /// 消息和原因都缺失时只写裸的 `Call cancelled`
    pub fn log_cancel(&self, call_id: &CallId, method: &str, reason: &CancelReason) -> Result<()> {
        self.log_entry(call_id, method, "Call cancelled", reason.describe().as_deref())
    }

    fn log_entry(
        &self,
        call_id: &CallId,
        method: &str,
        description: &str,
        data: Option<&str>,
    ) -> Result<()> {
        let line = match data {
            Some(data) => format!(
                "{} [call-id: {} method: {}]:\n{}",
                description, call_id, method, data
            ),
            None => format!("{} [call-id: {} method: {}]", description, call_id, method),
        };
        self.log(&line)
    }

    fn log(&self, message: &str) -> Result<()> {
        let line = format!("[{}] {}", self.name, message);
        self.write_line(&line)
    }

    fn write_line(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn report(&self, call: &CallIdentity, result: Result<()>) {
        if let Err(e) = result {
            warn!(
                logger = %self.name,
                call_id = %call.id,
                method = %call.method_name,
                error = %e,
                "Failed to write rpc log line"
            );
        }
    }
}

impl fmt::Debug for RpcLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcLogger")
            .field("name", &self.name)
            .field("log_data", &self.log_data)
            .finish_non_exhaustive()
    }
}

impl CallSink for RpcLogger {
    fn call_started(&self, call: &CallIdentity, metadata: Option<&RequestMetadata>) {
        self.report(call, self.log_start(&call.id, &call.method_name, metadata));
    }

    fn request_sent(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        let message = self.log_data.then_some(message);
        self.report(call, self.log_request(&call.id, &call.method_name, message));
    }

    fn response_received(&self, call: &CallIdentity, message: &dyn fmt::Debug) {
        let message = self.log_data.then_some(message);
        self.report(call, self.log_response(&call.id, &call.method_name, message));
    }

    fn call_finished(&self, call: &CallIdentity, summary: &CallSummary<'_>) {
        let result = match summary.outcome {
            Outcome::Closed(status) => self.log_close(&call.id, &call.method_name, status),
            Outcome::Cancelled(reason) => self.log_cancel(&call.id, &call.method_name, reason),
        };
        self.report(call, result);
    }

    fn cancel_after_finish(&self, call: &CallIdentity, reason: &CancelReason) {
        self.report(call, self.log_cancel(&call.id, &call.method_name, reason));
    }
}
