use http::StatusCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Fail to send a message: the receiver has been dropped")]
    SendError(#[from] futures::channel::mpsc::SendError),

    #[error("Fail to receive a message: the sender has been dropped")]
    ReceiveError,
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Fail to send a message: the peer has been dropped")]
    ChannelError(#[from] ChannelError),
}

/// The errors an operation can be completed with
///
/// Operation errors are shared behind an [Arc] so a stage passing an error
/// through, from a lower operation to the one it stems from, preserves the
/// error identity rather than wrapping or rephrasing it.
#[derive(Error, Debug)]
pub enum OperationError {
    /// An opaque error raised by the transport layer, never reinterpreted
    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    /// The request was transmitted, but the service answered with a
    /// non-success status
    #[error("HTTP request failed with status {status}: {context}")]
    Service { status: StatusCode, context: String },

    /// The service answered with a success status and an undecodable payload
    #[error("Failed to decode the response payload: {0}")]
    Translation(#[from] serde_json::Error),
}

/// The errors surfaced to the issuer of an operation
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    FromChannel(#[from] ChannelError),

    #[error("{0}")]
    FromOperation(Arc<OperationError>),

    #[error("Unexpected response")]
    UnexpectedResponse,
}

impl From<Arc<OperationError>> for ClientError {
    fn from(error: Arc<OperationError>) -> Self {
        ClientError::FromOperation(error)
    }
}
