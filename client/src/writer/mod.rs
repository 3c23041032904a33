//! Delivery of accounting records to the collector
//!
//! A [`RecordSink`] is one single-use session: zero or more `write` calls,
//! then `send_identifier`, then `finish`, which closes the stream and waits for
//! the collector's acknowledgment.

pub mod grpc;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::gateway::GatewayError;

pub use grpc::{AccountingStream, GrpcWriter, IpStream, StorageStream, VmStream};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to connect to collector at {endpoint}: {message}")]
    Connect { endpoint: String, message: String },

    #[error("Collector session already finished")]
    Finished,

    #[error("Collector stream closed")]
    StreamClosed,

    #[error("Rate limiter wait cancelled")]
    Cancelled,

    #[error("Collector call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Collector returned an error: {0}")]
    Status(#[from] tonic::Status),

    #[error("Collector session task failed: {0}")]
    Task(String),
}

impl WriterError {
    /// Whether the error means the run is being torn down
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<GatewayError<WriterError>> for WriterError {
    fn from(err: GatewayError<WriterError>) -> Self {
        match err {
            GatewayError::Cancelled => Self::Cancelled,
            GatewayError::Timeout(after) => Self::Timeout(after),
            GatewayError::Call(inner) => inner,
        }
    }
}

/// Destination of prepared records of one kind
#[async_trait]
pub trait RecordSink<R: Send + 'static>: Send + Sync {
    async fn write(&self, record: R) -> Result<(), WriterError>;

    /// Announce which client instance produced the records
    async fn send_identifier(&self) -> Result<(), WriterError>;

    /// Close the session and wait for the acknowledgment
    async fn finish(&self) -> Result<(), WriterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_conversion() {
        let err: WriterError = GatewayError::<WriterError>::Cancelled.into();
        assert!(err.is_fatal());

        let err: WriterError = GatewayError::Call(WriterError::StreamClosed).into();
        assert!(matches!(err, WriterError::StreamClosed));
        assert!(!err.is_fatal());

        let err: WriterError =
            GatewayError::<WriterError>::Timeout(Duration::from_secs(2)).into();
        assert_eq!(err.to_string(), "Collector call timed out after 2s");
    }

    #[test]
    fn test_status_display() {
        let err = WriterError::from(tonic::Status::unavailable("collector down"));
        assert!(err.to_string().contains("collector down"));
    }
}
