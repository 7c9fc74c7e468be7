use crate::ChannelError;
use crate::OperationError;
use crate::OperationPayload;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

/// Callback invoked exactly once with the outcome of an operation
///
/// The callback may run on another task than the one that issued the
/// operation, typically triggered by inbound network I/O.
pub type OperationCallback =
    Box<dyn FnOnce(OperationOutcome) -> Result<(), ChannelError> + Send + 'static>;

/// A unit of work flowing down a pipeline
///
/// An operation is exclusively owned by the stage currently processing it,
/// until it is handed to the next stage or completed. Completion is terminal
/// and consumes the operation: a completed operation cannot be completed a
/// second time, nor processed any further.
pub struct Operation {
    id: String,
    payload: OperationPayload,
    callback: OperationCallback,
}

impl Operation {
    pub fn new(payload: impl Into<OperationPayload>, callback: OperationCallback) -> Self {
        Operation {
            id: nanoid::nanoid!(),
            payload: payload.into(),
            callback,
        }
    }

    /// The opaque id of this operation, for tracing only
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut OperationPayload {
        &mut self.payload
    }

    /// Complete this operation, invoking its callback with the outcome
    ///
    /// An error is returned when the outcome cannot be delivered to the
    /// issuer; a stage completing an operation from an asynchronous
    /// continuation must funnel such an error to its background-exception
    /// reporter rather than let it reach the completing task.
    pub fn complete(self, error: Option<Arc<OperationError>>) -> Result<(), ChannelError> {
        let outcome = OperationOutcome {
            id: self.id,
            payload: self.payload,
            error,
        };
        (self.callback)(outcome)
    }

    /// Complete this operation successfully
    pub fn complete_ok(self) -> Result<(), ChannelError> {
        self.complete(None)
    }

    /// Complete this operation with an error
    pub fn complete_with_error(self, error: Arc<OperationError>) -> Result<(), ChannelError> {
        self.complete(Some(error))
    }
}

impl Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("id", &self.id)
            .field("payload", &self.payload)
            .finish()
    }
}

/// The final state of a completed operation, as delivered to its callback
#[derive(Debug)]
pub struct OperationOutcome {
    pub id: String,
    pub payload: OperationPayload,
    pub error: Option<Arc<OperationError>>,
}

impl OperationOutcome {
    /// The outcome as observed by the issuer: either a payload with its
    /// result fields populated, or an error — never both, never neither
    pub fn into_result(self) -> Result<OperationPayload, Arc<OperationError>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.payload),
        }
    }
}
