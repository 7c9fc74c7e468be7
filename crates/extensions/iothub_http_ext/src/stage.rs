use crate::paths;
use crate::user_agent;
use anyhow::anyhow;
use iothub_pipeline::ChannelError;
use iothub_pipeline::GetStorageInfo;
use iothub_pipeline::HttpRequestAndResponse;
use iothub_pipeline::InvokeMethod;
use iothub_pipeline::NotifyBlobUploadStatus;
use iothub_pipeline::Nucleus;
use iothub_pipeline::Operation;
use iothub_pipeline::OperationError;
use iothub_pipeline::OperationOutcome;
use iothub_pipeline::OperationPayload;
use iothub_pipeline::PipelineConfig;
use iothub_pipeline::PipelineStage;
use iothub_pipeline::StageContext;
use log::debug;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// REST API version sent with every request
pub const API_VERSION: &str = "2019-10-01";

const STAGE_NAME: &str = "IoTHub-HTTP";

/// The stage translating device operations into HTTP exchanges
///
/// Each recognized operation kind is turned into exactly one
/// [HttpRequestAndResponse] operation sent further down the pipeline. Its
/// completion is intercepted to translate the wire outcome back onto the
/// original operation: transport errors pass through unchanged, a success
/// status populates the kind-specific result field, a non-success status
/// becomes a service error. Unrecognized kinds pass through unmodified.
pub struct HttpTranslationStage {
    nucleus: Arc<Nucleus>,
}

impl HttpTranslationStage {
    pub fn new(nucleus: Arc<Nucleus>) -> Self {
        HttpTranslationStage { nucleus }
    }

    fn config(&self) -> &PipelineConfig {
        &self.nucleus.pipeline_configuration
    }

    /// The headers common to all the request kinds
    fn common_headers(&self, content_type: &str, body: &str) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), content_type.to_string());
        headers.insert("Content-Length".to_string(), body.len().to_string());
        headers.insert(
            "User-Agent".to_string(),
            user_agent::user_agent(&self.config().product_info_text()),
        );
        headers
    }

    fn invoke_method_request(&self, request: &InvokeMethod) -> HttpRequestAndResponse {
        let config = self.config();
        let path = paths::method_invoke_path(
            &request.target_device_id,
            request.target_module_id.as_deref(),
        );
        let body = request.method_params.to_string();
        let mut headers = self.common_headers("application/json", &body);
        // method invocation goes through the edge gateway when there is one
        let host = config
            .gateway_hostname
            .clone()
            .unwrap_or_else(|| config.hostname.clone());
        headers.insert("Host".to_string(), host);
        if let Some(module_id) = &config.module_id {
            headers.insert(
                "x-ms-edge-moduleId".to_string(),
                format!("{}/{}", config.device_id, module_id),
            );
        }
        HttpRequestAndResponse::post(path, api_query(), headers, body)
    }

    fn storage_info_request(&self, request: &GetStorageInfo) -> HttpRequestAndResponse {
        let config = self.config();
        let path = paths::storage_info_path(&config.device_id);
        let body = json!({ "blobName": request.blob_name }).to_string();
        let mut headers = self.common_headers("application/json", &body);
        headers.insert("Host".to_string(), config.hostname.clone());
        headers.insert("Accept".to_string(), "application/json".to_string());
        HttpRequestAndResponse::post(path, api_query(), headers, body)
    }

    fn upload_status_request(&self, request: &NotifyBlobUploadStatus) -> HttpRequestAndResponse {
        let config = self.config();
        let path = paths::upload_status_path(&config.device_id);
        let body = json!({
            "correlationId": request.correlation_id,
            "isSuccess": request.is_success,
            "statusCode": request.request_status_code,
            "statusDescription": request.status_description,
        })
        .to_string();
        let mut headers = self.common_headers("application/json; charset=utf-8", &body);
        headers.insert("Host".to_string(), config.hostname.clone());
        HttpRequestAndResponse::post(path, api_query(), headers, body)
    }

    /// Attach the completion interceptor to a new HTTP operation carrying the
    /// given request, and send it down in place of the original operation
    fn send_request(
        &self,
        op: Operation,
        request: HttpRequestAndResponse,
        cx: &mut StageContext<'_>,
    ) {
        debug!(
            target: STAGE_NAME,
            "{}: POST {}?{}",
            op.id(),
            request.path,
            request.query_params
        );
        let background = cx.background_reporter();
        let http_op = Operation::new(
            request,
            Box::new(move |outcome| {
                if let Err(error) = complete_translated(op, outcome) {
                    background.report(STAGE_NAME, error.into());
                }
                Ok(())
            }),
        );
        cx.send_op_down(http_op);
    }
}

impl PipelineStage for HttpTranslationStage {
    fn name(&self) -> &str {
        STAGE_NAME
    }

    fn run_op(&mut self, op: Operation, cx: &mut StageContext<'_>) {
        let request = match op.payload() {
            OperationPayload::InvokeMethod(request) => self.invoke_method_request(request),
            OperationPayload::GetStorageInfo(request) => self.storage_info_request(request),
            OperationPayload::NotifyBlobUploadStatus(request) => {
                self.upload_status_request(request)
            }
            // any kind this stage does not understand moves on to the next stage
            _ => return cx.send_op_down(op),
        };
        self.send_request(op, request, cx)
    }
}

fn api_query() -> String {
    format!("api-version={API_VERSION}")
}

/// Complete the original operation from the outcome of its HTTP operation
///
/// Runs on whatever task completed the HTTP operation. Every completion path
/// of the HTTP operation leads to exactly one completion of the original
/// operation; the returned error denotes an undeliverable completion and is
/// to be reported in the background, not raised to the completing task.
fn complete_translated(
    mut original: Operation,
    outcome: OperationOutcome,
) -> Result<(), ChannelError> {
    if let Some(error) = outcome.error {
        // transport errors pass through unchanged
        return original.complete(Some(error));
    }
    let OperationPayload::HttpRequestAndResponse(response) = outcome.payload else {
        // the payload of an operation is never swapped along the chain
        return original.complete(Some(Arc::new(OperationError::Transport(anyhow!(
            "HTTP operation completed with a foreign payload"
        )))));
    };
    match response.status_code {
        Some(status) if status.is_success() => {
            match assign_response(original.payload_mut(), &response) {
                Ok(()) => original.complete(None),
                Err(error) => {
                    original.complete(Some(Arc::new(OperationError::Translation(error))))
                }
            }
        }
        Some(status) => original.complete(Some(Arc::new(OperationError::Service {
            status,
            context: String::from_utf8_lossy(response.response_body.as_deref().unwrap_or_default())
                .into_owned(),
        }))),
        None => original.complete(Some(Arc::new(OperationError::Transport(anyhow!(
            "HTTP operation completed without a status code"
        ))))),
    }
}

/// Deserialize the response body, when present and non-empty, into the
/// result field of the original operation
fn assign_response(
    payload: &mut OperationPayload,
    response: &HttpRequestAndResponse,
) -> Result<(), serde_json::Error> {
    let body = match &response.response_body {
        Some(body) if !body.is_empty() => body.as_slice(),
        _ => return Ok(()),
    };
    match payload {
        OperationPayload::InvokeMethod(request) => {
            request.method_response = Some(serde_json::from_slice(body)?);
        }
        OperationPayload::GetStorageInfo(request) => {
            request.storage_info = Some(serde_json::from_slice(body)?);
        }
        _ => {}
    }
    Ok(())
}
