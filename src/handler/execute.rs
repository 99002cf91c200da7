use super::{CallDetails, CallHandler, ExecuteDetails};
use crate::proto::{ExecuteRequest, Operation};

/// `Execution/Execute` 处理器：保留请求与最新的操作状态
#[derive(Debug, Default)]
pub struct ExecuteHandler {
    details: ExecuteDetails,
}

impl ExecuteHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CallHandler for ExecuteHandler {
    type Request = ExecuteRequest;
    type Response = Operation;

    fn handle_request(&mut self, message: &ExecuteRequest) {
        self.details.request = Some(message.clone());
    }

    fn handle_response(&mut self, message: &Operation) {
        self.details.operation = Some(message.clone());
    }

    fn into_details(self) -> CallDetails {
        CallDetails::Execute(self.details)
    }
}
