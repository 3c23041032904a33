//! Pipeline error types

use thiserror::Error;

use crate::reader::ReadError;
use crate::resource::ResourceError;
use crate::writer::WriterError;

use super::window::WindowError;

/// Failure that halts the whole run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read from cloud: {0}")]
    Read(ReadError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid resource: {0}")]
    Resource(#[from] ResourceError),

    #[error("Invalid filter window: {0}")]
    Window(#[from] WindowError),

    #[error("Collector session failed: {0}")]
    Writer(WriterError),

    #[error("Stage channel closed unexpectedly: {0}")]
    ChannelClosed(&'static str),

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<ReadError> for PipelineError {
    fn from(err: ReadError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Read(err)
        }
    }
}

impl From<WriterError> for PipelineError {
    fn from(err: WriterError) -> Self {
        if err.is_fatal() {
            Self::Cancelled
        } else {
            Self::Writer(err)
        }
    }
}

/// Failure confined to a single record; the record is skipped
#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("Required field '{field}' unavailable: {source}")]
    Required {
        field: &'static str,
        source: ResourceError,
    },

    #[error("Required field '{0}' has no value")]
    Missing(&'static str),
}

/// Attach a field name to a required derivation
pub trait RequiredField<T> {
    fn required(self, field: &'static str) -> Result<T, PrepareError>;
}

impl<T> RequiredField<T> for Result<T, ResourceError> {
    fn required(self, field: &'static str) -> Result<T, PrepareError> {
        self.map_err(|source| PrepareError::Required { field, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::CloudError;
    use crate::gateway::GatewayError;

    #[test]
    fn test_cancelled_read_maps_to_cancelled() {
        let err: PipelineError = GatewayError::<CloudError>::Cancelled.into();
        assert!(matches!(err, PipelineError::Cancelled));

        let err: PipelineError = GatewayError::Call(CloudError::InvalidPageOffset(0)).into();
        assert!(matches!(err, PipelineError::Read(_)));
    }

    #[test]
    fn test_required_field_context() {
        let result: Result<i64, ResourceError> = Err(ResourceError::MissingId);
        let err = result.required("vm_uuid").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required field 'vm_uuid' unavailable: Resource has no assigned id"
        );
    }
}
