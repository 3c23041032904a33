//! Cloud resources as immutable snapshots
//!
//! Every resource is an XML element fetched from the cloud API for the duration
//! of one run. The [`Resource`] capability gives uniform access to the id and to
//! attributes by path; each kind adds typed accessors for what record assembly
//! needs.

pub mod element;
pub mod kinds;

use std::str::FromStr;

use thiserror::Error;

pub use element::Element;
pub use kinds::{
    Cluster, Disk, HistoryRecord, Host, Image, NetUser, Nic, User, VirtualMachine, VmState,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Resource has no assigned id")]
    MissingId,

    #[error("Attribute '{0}' is not set")]
    MissingAttribute(String),

    #[error("Attribute '{path}' has invalid value '{value}'")]
    InvalidValue { path: String, value: String },

    #[error("Malformed XML: {0}")]
    Xml(String),
}

/// Polymorphic access to an accounted or reference resource
pub trait Resource: Send + Sync + 'static {
    /// Underlying element (`<VM>`, `<USER>`, ...)
    fn element(&self) -> &Element;

    /// Numeric id; fails when the resource has no assigned id
    fn id(&self) -> Result<i64, ResourceError> {
        let raw = self
            .element()
            .find("ID")
            .map(|e| e.text())
            .filter(|t| !t.is_empty())
            .ok_or(ResourceError::MissingId)?;
        raw.parse().map_err(|_| ResourceError::InvalidValue {
            path: "ID".to_string(),
            value: raw.to_string(),
        })
    }

    /// Text at `path`; fails when the path is absent
    fn attribute(&self, path: &str) -> Result<&str, ResourceError> {
        self.element()
            .find(path)
            .map(|e| e.text())
            .ok_or_else(|| ResourceError::MissingAttribute(path.to_string()))
    }

    /// Attribute at `path` parsed into `T`; fails when absent, empty or unparsable
    fn parsed<T: FromStr>(&self, path: &str) -> Result<T, ResourceError>
    where
        Self: Sized,
    {
        let raw = self.attribute(path)?;
        if raw.is_empty() {
            return Err(ResourceError::MissingAttribute(path.to_string()));
        }
        raw.trim().parse().map_err(|_| ResourceError::InvalidValue {
            path: path.to_string(),
            value: raw.to_string(),
        })
    }
}
