use http::Method;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;

/// The payload of an operation flowing down a pipeline
///
/// A closed set of kinds: each stage matches on the kinds it understands and
/// forwards every other kind, unmodified, to the next stage.
#[derive(Debug)]
pub enum OperationPayload {
    InvokeMethod(InvokeMethod),
    GetStorageInfo(GetStorageInfo),
    NotifyBlobUploadStatus(NotifyBlobUploadStatus),
    HttpRequestAndResponse(HttpRequestAndResponse),
}

/// Invoke a method on a target device, or on one of its modules
#[derive(Debug)]
pub struct InvokeMethod {
    pub target_device_id: String,
    pub target_module_id: Option<String>,

    /// Free-form parameters forwarded verbatim to the invoked method
    pub method_params: Value,

    /// Deserialized response of the invoked method, set on completion
    pub method_response: Option<Value>,
}

impl InvokeMethod {
    pub fn new(
        target_device_id: impl Into<String>,
        target_module_id: Option<String>,
        method_params: Value,
    ) -> Self {
        InvokeMethod {
            target_device_id: target_device_id.into(),
            target_module_id,
            method_params,
            method_response: None,
        }
    }
}

/// Request storage credentials to upload a blob
#[derive(Debug)]
pub struct GetStorageInfo {
    pub blob_name: String,

    /// Deserialized storage credentials, set on completion
    pub storage_info: Option<Value>,
}

impl GetStorageInfo {
    pub fn new(blob_name: impl Into<String>) -> Self {
        GetStorageInfo {
            blob_name: blob_name.into(),
            storage_info: None,
        }
    }
}

/// Report the outcome of a blob upload
#[derive(Debug)]
pub struct NotifyBlobUploadStatus {
    pub correlation_id: String,
    pub is_success: bool,

    /// Status code of the upload being reported, not to be confused with the
    /// status code of the notification response
    pub request_status_code: u16,
    pub status_description: String,
}

/// An HTTP exchange, to be resolved by the transport stage
///
/// This is the only kind the transport stage consumes: the request fields are
/// set by the stage synthesizing the operation, the response fields by the
/// transport stage before it completes the operation.
#[derive(Debug)]
pub struct HttpRequestAndResponse {
    pub method: Method,
    pub path: String,
    pub query_params: String,
    pub headers: HashMap<String, String>,
    pub body: String,

    /// Status code of the response, set by the transport stage
    pub status_code: Option<StatusCode>,

    /// Raw body of the response, set by the transport stage
    pub response_body: Option<Vec<u8>>,
}

impl HttpRequestAndResponse {
    pub fn post(
        path: String,
        query_params: String,
        headers: HashMap<String, String>,
        body: String,
    ) -> Self {
        HttpRequestAndResponse {
            method: Method::POST,
            path,
            query_params,
            headers,
            body,
            status_code: None,
            response_body: None,
        }
    }
}

impl From<InvokeMethod> for OperationPayload {
    fn from(request: InvokeMethod) -> Self {
        OperationPayload::InvokeMethod(request)
    }
}

impl From<GetStorageInfo> for OperationPayload {
    fn from(request: GetStorageInfo) -> Self {
        OperationPayload::GetStorageInfo(request)
    }
}

impl From<NotifyBlobUploadStatus> for OperationPayload {
    fn from(request: NotifyBlobUploadStatus) -> Self {
        OperationPayload::NotifyBlobUploadStatus(request)
    }
}

impl From<HttpRequestAndResponse> for OperationPayload {
    fn from(request: HttpRequestAndResponse) -> Self {
        OperationPayload::HttpRequestAndResponse(request)
    }
}

/// An event flowing up a pipeline, from the network to the client
///
/// Events are notifications, not request/response pairs: they have no
/// completion state and stages forward them upward unmodified by default.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Event {
    Connected,
    Disconnected,
    MessageReceived(Vec<u8>),
}
