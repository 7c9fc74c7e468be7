use crate::ChannelError;
use crate::ClientError;
use crate::DynSender;
use crate::Event;
use crate::GetStorageInfo;
use crate::InvokeMethod;
use crate::NotifyBlobUploadStatus;
use crate::Operation;
use crate::OperationPayload;
use crate::PipelineInput;
use crate::Sender;
use futures::channel::mpsc;
use futures::channel::oneshot;
use serde_json::Value;

/// Handle used by the device client to issue operations to a pipeline
#[derive(Clone)]
pub struct PipelineHandle {
    input: mpsc::Sender<PipelineInput>,
}

impl PipelineHandle {
    pub(crate) fn new(input: mpsc::Sender<PipelineInput>) -> Self {
        PipelineHandle { input }
    }

    /// A sender the transport layer uses to push events into the pipeline
    pub fn event_sender(&self) -> DynSender<Event> {
        self.input.sender_clone()
    }

    /// Send an operation down the pipeline and await its outcome
    pub async fn run_operation(
        &mut self,
        payload: impl Into<OperationPayload>,
    ) -> Result<OperationPayload, ClientError> {
        let (sender, receiver) = oneshot::channel();
        let op = Operation::new(
            payload,
            Box::new(move |outcome| sender.send(outcome).map_err(|_| ChannelError::ReceiveError)),
        );
        Sender::send(&mut self.input, op).await?;
        let outcome = receiver.await.map_err(|_| ChannelError::ReceiveError)?;
        Ok(outcome.into_result()?)
    }

    /// Invoke a method on a device, or on one of its modules,
    /// and await the method response
    pub async fn invoke_method(
        &mut self,
        target_device_id: impl Into<String>,
        target_module_id: Option<String>,
        method_params: Value,
    ) -> Result<Option<Value>, ClientError> {
        let request = InvokeMethod::new(target_device_id, target_module_id, method_params);
        match self.run_operation(request).await? {
            OperationPayload::InvokeMethod(response) => Ok(response.method_response),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request storage credentials to upload a blob
    pub async fn get_storage_info(
        &mut self,
        blob_name: impl Into<String>,
    ) -> Result<Option<Value>, ClientError> {
        let request = GetStorageInfo::new(blob_name);
        match self.run_operation(request).await? {
            OperationPayload::GetStorageInfo(response) => Ok(response.storage_info),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Report the outcome of a blob upload
    pub async fn notify_blob_upload_status(
        &mut self,
        correlation_id: impl Into<String>,
        is_success: bool,
        request_status_code: u16,
        status_description: impl Into<String>,
    ) -> Result<(), ClientError> {
        let request = NotifyBlobUploadStatus {
            correlation_id: correlation_id.into(),
            is_success,
            request_status_code,
            status_description: status_description.into(),
        };
        match self.run_operation(request).await? {
            OperationPayload::NotifyBlobUploadStatus(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}
