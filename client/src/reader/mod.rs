//! Listing and retrieval of cloud resources
//!
//! Each method builds one kind-specific request and sends it through the
//! read-side [`RateLimitedGateway`].

use std::sync::Arc;

use crate::cloud::{CloudApi, CloudError};
use crate::core::constants::PAGE_SIZE;
use crate::gateway::{GatewayError, RateLimitedGateway};
use crate::resource::{Cluster, Host, Image, User, VirtualMachine};

pub type ReadError = GatewayError<CloudError>;

#[derive(Clone)]
pub struct ResourceReader {
    api: Arc<dyn CloudApi>,
    gateway: RateLimitedGateway,
}

impl ResourceReader {
    pub fn new(api: Arc<dyn CloudApi>, gateway: RateLimitedGateway) -> Self {
        Self { api, gateway }
    }

    /// Page of compute instances; offsets start at 1
    pub async fn list_vm_page(&self, offset: u32) -> Result<Vec<VirtualMachine>, ReadError> {
        self.gateway
            .call("list_vm_page", move || self.api.vm_page(offset, PAGE_SIZE))
            .await
    }

    pub async fn retrieve_vm(&self, id: i64) -> Result<VirtualMachine, ReadError> {
        self.gateway
            .call("retrieve_vm", move || self.api.vm(id))
            .await
    }

    pub async fn list_active_vms_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<VirtualMachine>, ReadError> {
        self.gateway
            .call("list_active_vms_for_user", move || {
                self.api.active_vms_of_user(user_id)
            })
            .await
    }

    pub async fn list_all_users(&self) -> Result<Vec<User>, ReadError> {
        self.gateway
            .call("list_all_users", move || self.api.users())
            .await
    }

    pub async fn list_all_images(&self) -> Result<Vec<Image>, ReadError> {
        self.gateway
            .call("list_all_images", move || self.api.images())
            .await
    }

    pub async fn list_all_hosts(&self) -> Result<Vec<Host>, ReadError> {
        self.gateway
            .call("list_all_hosts", move || self.api.hosts())
            .await
    }

    pub async fn list_all_clusters(&self) -> Result<Vec<Cluster>, ReadError> {
        self.gateway
            .call("list_all_clusters", move || self.api.clusters())
            .await
    }
}
