use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cloudtally_proto::IpRecord;

use crate::core::constants::TEMPLATE_IDENTITY;
use crate::domain::{SiteSettings, fqan};
use crate::pipeline::{PipelineError, PrepareError, Preparer, RequiredField};
use crate::resource::{NetUser, Resource};
use crate::utils::net::is_public_ipv4;
use crate::utils::time::to_timestamp;
use crate::writer::RecordSink;

const IPV4: &str = "IPv4";
const IPV6: &str = "IPv6";

/// Emits one record per address family a user holds public addresses in
pub struct IpPreparer {
    settings: SiteSettings,
    sink: Arc<dyn RecordSink<IpRecord>>,
}

impl IpPreparer {
    pub fn new(settings: SiteSettings, sink: Arc<dyn RecordSink<IpRecord>>) -> Self {
        Self { settings, sink }
    }
}

/// Public IPv4 and global IPv6 addresses across the user's instances.
/// A NIC with a public IPv4 address is not counted again for IPv6.
fn count_ips(net_user: &NetUser) -> (u32, u32) {
    let mut ipv4 = 0;
    let mut ipv6 = 0;
    for nic in net_user.active_vms.iter().flat_map(|vm| vm.nics()) {
        if nic.ip.is_some_and(is_public_ipv4) {
            ipv4 += 1;
        } else if nic.ip6_global.is_some() {
            ipv6 += 1;
        }
    }
    (ipv4, ipv6)
}

#[async_trait]
impl Preparer for IpPreparer {
    type Item = NetUser;
    type Record = IpRecord;
    type Lookups = ();

    async fn initialize_lookups(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    fn assemble(
        &self,
        _lookups: &(),
        net_user: &NetUser,
        now: DateTime<Utc>,
    ) -> Result<Vec<IpRecord>, PrepareError> {
        let id = net_user.id().required("local_user")?;
        let group = net_user.user.group().required("local_group")?;
        let global_user_name = net_user
            .attribute(TEMPLATE_IDENTITY)
            .map(str::to_string)
            .unwrap_or_else(|_| id.to_string());
        let group_attribute = match net_user.user.group_name() {
            Ok(name) => Some(fqan(name)),
            Err(e) => {
                tracing::warn!(error = %e, user_id = id, "User has no group name");
                None
            }
        };

        let (ipv4, ipv6) = count_ips(net_user);
        tracing::debug!(user_id = id, vms = net_user.active_vms.len(), ipv4, ipv6, "Counted public addresses");

        let record = |ip_type: &str, ip_count: u32| IpRecord {
            measurement_time: Some(to_timestamp(now)),
            site_name: self.settings.site_name.clone(),
            cloud_compute_service: self.settings.cloud_compute_service.clone(),
            cloud_type: self.settings.cloud_type.clone(),
            local_user: id.to_string(),
            local_group: group.to_string(),
            global_user_name: global_user_name.clone(),
            fqan: group_attribute.clone(),
            ip_type: ip_type.to_string(),
            ip_count,
        };

        Ok([(IPV4, ipv4), (IPV6, ipv6)]
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(ip_type, count)| record(ip_type, count))
            .collect())
    }

    fn sink(&self) -> &dyn RecordSink<IpRecord> {
        self.sink.as_ref()
    }
}
