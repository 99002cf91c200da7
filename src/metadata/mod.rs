//! 请求元数据
//!
//! 元数据以 protobuf 编码放在二进制请求头中。它只用于诊断，
//! 缺失或损坏时按"不存在"处理，不影响调用本身。

use prost::Message;
use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::debug;

use crate::error::{Result, RpcLogError};
use crate::proto::RequestMetadata;

/// 请求元数据所在的二进制请求头
pub const REQUEST_METADATA_KEY: &str = "google.devtools.remoteexecution.v1test.requestmetadata-bin";

/// 读取请求元数据
///
/// 请求头缺失时返回 `Ok(None)`，存在但无法解码时返回错误。
pub fn try_extract_request_metadata(headers: &MetadataMap) -> Result<Option<RequestMetadata>> {
    let Some(value) = headers.get_bin(REQUEST_METADATA_KEY) else {
        return Ok(None);
    };

    let bytes = value
        .to_bytes()
        .map_err(|e| RpcLogError::metadata(format!("invalid binary header: {}", e)))?;
    let metadata = RequestMetadata::decode(bytes)?;
    Ok(Some(metadata))
}

/// 尽力读取请求元数据，任何失败都视为不存在
pub fn extract_request_metadata(headers: &MetadataMap) -> Option<RequestMetadata> {
    match try_extract_request_metadata(headers) {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!(error = %e, "Ignoring unreadable request metadata header");
            None
        }
    }
}

/// 把请求元数据写入请求头（覆盖已有值）
pub fn attach_request_metadata(headers: &mut MetadataMap, metadata: &RequestMetadata) {
    let value = MetadataValue::from_bytes(&metadata.encode_to_vec());
    headers.insert_bin(REQUEST_METADATA_KEY, value);
}

/// 为 tonic 客户端请求附加请求元数据的拦截器
#[derive(Debug, Clone)]
pub struct RequestMetadataInjector {
    metadata: RequestMetadata,
}

impl RequestMetadataInjector {
    pub fn new(metadata: RequestMetadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }
}

impl Interceptor for RequestMetadataInjector {
    fn call(&mut self, mut req: Request<()>) -> std::result::Result<Request<()>, Status> {
        attach_request_metadata(req.metadata_mut(), &self.metadata);
        Ok(req)
    }
}
