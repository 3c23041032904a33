//! Cloud management API access
//!
//! [`CloudApi`] is the seam between the pipeline and the cloud: one method per
//! access pattern the pipeline needs. [`OpenNebulaClient`] implements it over
//! XML-RPC.

mod error;
pub mod opennebula;
pub mod xmlrpc;

use async_trait::async_trait;

pub use error::CloudError;
pub use opennebula::OpenNebulaClient;

use crate::resource::{Cluster, Host, Image, User, VirtualMachine};

#[async_trait]
pub trait CloudApi: Send + Sync {
    /// One page of compute instances of all owners in any state (including done)
    async fn vm_page(&self, offset: u32, page_size: u32)
    -> Result<Vec<VirtualMachine>, CloudError>;

    /// Full detail of one compute instance
    async fn vm(&self, id: i64) -> Result<VirtualMachine, CloudError>;

    /// Active compute instances owned by a user
    async fn active_vms_of_user(&self, user_id: i64) -> Result<Vec<VirtualMachine>, CloudError>;

    async fn users(&self) -> Result<Vec<User>, CloudError>;

    async fn images(&self) -> Result<Vec<Image>, CloudError>;

    async fn hosts(&self) -> Result<Vec<Host>, CloudError>;

    async fn clusters(&self) -> Result<Vec<Cluster>, CloudError>;
}
