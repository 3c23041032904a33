//! Lookup tables resolved once per run before record assembly
//!
//! Each table maps a reference resource id to one of its attributes. Tables
//! are built from a full listing of the reference kind and are read-only
//! afterward. A listing failure leaves the table empty, so every lookup
//! degrades to an absent optional field; only a cancelled run aborts warm-up.

use std::collections::HashMap;

use crate::core::constants::{
    TEMPLATE_APPLIANCE_MPURI, TEMPLATE_BENCHMARK_TYPE, TEMPLATE_BENCHMARK_VALUE,
    TEMPLATE_IDENTITY,
};
use crate::reader::{ReadError, ResourceReader};
use crate::resource::{Cluster, Host, Image, Resource, User};

use super::PipelineError;

/// Resource id to attribute value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: HashMap<i64, String>,
}

impl LookupTable {
    /// Build from a listing; resources without an id are skipped
    pub fn build<R: Resource>(
        kind: &'static str,
        resources: &[R],
        value: impl Fn(&R, i64) -> String,
    ) -> Self {
        let mut entries = HashMap::with_capacity(resources.len());
        for resource in resources {
            match resource.id() {
                Ok(id) => {
                    entries.insert(id, value(resource, id));
                }
                Err(e) => tracing::error!(error = %e, kind, "Skipping resource without id"),
            }
        }
        Self { entries }
    }

    /// Value for `id`; a miss and a blank value are both absent
    pub fn get(&self, id: i64) -> Option<&str> {
        self.entries
            .get(&id)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Attribute at `path`, or the resource's own id when unset
fn attribute_or_id<R: Resource>(resource: &R, id: i64, path: &str) -> String {
    resource
        .attribute(path)
        .map(str::to_string)
        .unwrap_or_else(|_| id.to_string())
}

pub fn user_identities(users: &[User]) -> LookupTable {
    LookupTable::build("user", users, |user, id| {
        attribute_or_id(user, id, TEMPLATE_IDENTITY)
    })
}

pub fn image_appliances(images: &[Image]) -> LookupTable {
    LookupTable::build("image", images, |image, id| {
        attribute_or_id(image, id, TEMPLATE_APPLIANCE_MPURI)
    })
}

/// Benchmark type and value per host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BenchmarkTable {
    pub types: LookupTable,
    pub values: LookupTable,
}

/// Host benchmarks; a host without its own value inherits its cluster's
pub fn host_benchmarks(hosts: &[Host], clusters: &[Cluster]) -> BenchmarkTable {
    let cluster_attribute = |path: &'static str| {
        LookupTable::build("cluster", clusters, move |cluster, id| {
            cluster.attribute(path).map(str::to_string).unwrap_or_else(|e| {
                tracing::warn!(error = %e, cluster = id, "Cluster has no benchmark attribute");
                String::new()
            })
        })
    };
    let cluster_types = cluster_attribute(TEMPLATE_BENCHMARK_TYPE);
    let cluster_values = cluster_attribute(TEMPLATE_BENCHMARK_VALUE);

    let host_attribute = |path: &'static str, fallback: &LookupTable| {
        LookupTable::build("host", hosts, |host, _| match host.attribute(path) {
            Ok(value) => value.to_string(),
            Err(_) => match host.cluster_id() {
                Ok(cluster) => fallback.get(cluster).unwrap_or_default().to_string(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to get cluster of host");
                    String::new()
                }
            },
        })
    };

    BenchmarkTable {
        types: host_attribute(TEMPLATE_BENCHMARK_TYPE, &cluster_types),
        values: host_attribute(TEMPLATE_BENCHMARK_VALUE, &cluster_values),
    }
}

// ============================================================================
// WARM-UP LOADERS
// ============================================================================

/// Listing result, or an empty listing when the read failed
fn or_empty<T>(kind: &'static str, result: Result<Vec<T>, ReadError>) -> Result<Vec<T>, PipelineError> {
    match result {
        Ok(items) => Ok(items),
        Err(e) if e.is_cancelled() => Err(PipelineError::Cancelled),
        Err(e) => {
            tracing::error!(error = %e, kind, "Failed to list reference resources, lookups will be empty");
            Ok(Vec::new())
        }
    }
}

pub async fn load_user_identities(reader: &ResourceReader) -> Result<LookupTable, PipelineError> {
    let users = or_empty("user", reader.list_all_users().await)?;
    let table = user_identities(&users);
    tracing::debug!(entries = table.len(), "Loaded user identities");
    Ok(table)
}

pub async fn load_image_appliances(reader: &ResourceReader) -> Result<LookupTable, PipelineError> {
    let images = or_empty("image", reader.list_all_images().await)?;
    let table = image_appliances(&images);
    tracing::debug!(entries = table.len(), "Loaded image appliances");
    Ok(table)
}

pub async fn load_host_benchmarks(reader: &ResourceReader) -> Result<BenchmarkTable, PipelineError> {
    let (hosts, clusters) = tokio::join!(reader.list_all_hosts(), reader.list_all_clusters());
    let hosts = or_empty("host", hosts)?;
    let clusters = or_empty("cluster", clusters)?;
    let table = host_benchmarks(&hosts, &clusters);
    tracing::debug!(entries = table.types.len(), "Loaded host benchmarks");
    Ok(table)
}
