use super::{CallDetails, CallHandler, WatchDetails};
use crate::proto::{ChangeBatch, WatchRequest};

/// `Watcher/Watch` 处理器：按接收顺序保留全部变更批次，不去重
#[derive(Debug, Default)]
pub struct WatchHandler {
    details: WatchDetails,
}

impl WatchHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CallHandler for WatchHandler {
    type Request = WatchRequest;
    type Response = ChangeBatch;

    fn handle_request(&mut self, message: &WatchRequest) {
        self.details.request = Some(message.clone());
    }

    fn handle_response(&mut self, message: &ChangeBatch) {
        self.details.change_batches.push(message.clone());
    }

    fn into_details(self) -> CallDetails {
        CallDetails::Watch(self.details)
    }
}
