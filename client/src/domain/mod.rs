//! Resource kinds wired into the pipeline
//!
//! | Kind      | Listing          | Enrichment              | Filter       | Record          |
//! |-----------|------------------|-------------------------|--------------|-----------------|
//! | `compute` | paginated VMs    | full VM detail          | time window  | `VmRecord`      |
//! | `network` | all users        | active VMs of the user  | pass-through | `IpRecord`      |
//! | `storage` | all images       | none                    | pass-through | `StorageRecord` |

pub mod compute;
pub mod network;
pub mod storage;

/// Site attributes stamped on compute and network records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub site_name: String,
    pub cloud_type: String,
    pub cloud_compute_service: Option<String>,
}

/// Attributes stamped on storage records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub site: Option<String>,
    /// Cloud endpoint the images live on
    pub storage_system: String,
}

/// VOMS-style group attribute for a group name
pub fn fqan(group_name: &str) -> String {
    format!("/{group_name}/Role=NULL/Capability=NULL")
}
