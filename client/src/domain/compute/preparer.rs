use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cloudtally_proto::VmRecord;

use crate::domain::{SiteSettings, fqan};
use crate::pipeline::lookup::{load_host_benchmarks, load_image_appliances, load_user_identities};
use crate::pipeline::{
    BenchmarkTable, LookupTable, PipelineError, PrepareError, Preparer, RequiredField,
};
use crate::reader::ResourceReader;
use crate::resource::{HistoryRecord, Resource, VirtualMachine};
use crate::utils::net::is_public_ipv4;
use crate::utils::time::{to_duration, to_timestamp};
use crate::writer::RecordSink;

/// Lookup tables for compute records
#[derive(Debug, Clone, Default)]
pub struct VmLookups {
    /// User id to global identity
    pub identities: LookupTable,
    /// Image id to appliance marketplace URI
    pub appliances: LookupTable,
    /// Host id to benchmark
    pub benchmarks: BenchmarkTable,
}

pub struct VmPreparer {
    reader: ResourceReader,
    settings: SiteSettings,
    sink: Arc<dyn RecordSink<VmRecord>>,
}

impl VmPreparer {
    pub fn new(
        reader: ResourceReader,
        settings: SiteSettings,
        sink: Arc<dyn RecordSink<VmRecord>>,
    ) -> Self {
        Self {
            reader,
            settings,
            sink,
        }
    }
}

/// Seconds spent on hosts; a still-open history record runs until `now`
fn wall_seconds(history: &[HistoryRecord], now: DateTime<Utc>) -> i64 {
    history
        .iter()
        .filter_map(|record| {
            let start = record.rstime?;
            let end = match record.retime? {
                0 => now.timestamp(),
                end => end,
            };
            Some(end - start)
        })
        .sum()
}

/// Total disk size in MB; unknown when any disk has no size
fn disk_total(vm: &VirtualMachine) -> Option<u64> {
    vm.disks().iter().map(|disk| disk.size).sum()
}

fn public_ip_count(vm: &VirtualMachine) -> u64 {
    vm.nics()
        .iter()
        .filter(|nic| nic.ip.is_some_and(is_public_ipv4) || nic.ip6_global.is_some())
        .count() as u64
}

#[async_trait]
impl Preparer for VmPreparer {
    type Item = VirtualMachine;
    type Record = VmRecord;
    type Lookups = VmLookups;

    async fn initialize_lookups(&self) -> Result<VmLookups, PipelineError> {
        let (identities, appliances, benchmarks) = tokio::try_join!(
            load_user_identities(&self.reader),
            load_image_appliances(&self.reader),
            load_host_benchmarks(&self.reader),
        )?;
        Ok(VmLookups {
            identities,
            appliances,
            benchmarks,
        })
    }

    fn assemble(
        &self,
        lookups: &VmLookups,
        vm: &VirtualMachine,
        now: DateTime<Utc>,
    ) -> Result<Vec<VmRecord>, PrepareError> {
        let id = vm.id().required("vm_uuid")?;
        let machine_name = vm.deploy_id().required("machine_name")?;
        let owner = vm.user().required("global_user_name")?;
        let start = vm.start_time().required("start_time")?;

        let end = vm.end_time().unwrap_or_else(|e| {
            tracing::warn!(error = %e, id, "Failed to get end time");
            None
        });
        let wall = wall_seconds(&vm.history(), now);
        let first_host = vm.history().first().and_then(|record| record.host_id);
        let first_image = vm.disks().first().and_then(|disk| disk.image_id);

        let record = VmRecord {
            vm_uuid: id.to_string(),
            site_name: self.settings.site_name.clone(),
            cloud_compute_service: self.settings.cloud_compute_service.clone(),
            machine_name: machine_name.to_string(),
            local_user_id: Some(owner.to_string()),
            local_group_id: vm.group().ok().map(|gid| gid.to_string()),
            global_user_name: lookups.identities.get(owner).map(str::to_string),
            fqan: vm.group_name().ok().map(fqan),
            status: vm.state().ok().map(|state| state.as_str().to_string()),
            start_time: Some(to_timestamp(start)),
            end_time: end.map(to_timestamp),
            suspend_duration: end
                .map(|end| to_duration((end - start).num_seconds() - wall)),
            wall_duration: Some(to_duration(wall)),
            cpu_duration: Some(to_duration(wall)),
            cpu_count: vm.vcpu().ok(),
            network_type: None,
            network_inbound: vm.parsed("MONITORING/NETTX").ok(),
            network_outbound: vm.parsed("MONITORING/NETRX").ok(),
            public_ip_count: Some(public_ip_count(vm)),
            memory: vm.memory().ok(),
            disk: disk_total(vm),
            benchmark_type: first_host
                .and_then(|host| lookups.benchmarks.types.get(host))
                .map(str::to_string),
            benchmark: first_host
                .and_then(|host| lookups.benchmarks.values.get(host))
                .and_then(|value| value.trim().parse::<f32>().ok()),
            storage_record_id: None,
            image_id: first_image
                .and_then(|image| lookups.appliances.get(image))
                .map(str::to_string),
            cloud_type: Some(self.settings.cloud_type.clone()),
        };
        Ok(vec![record])
    }

    fn sink(&self) -> &dyn RecordSink<VmRecord> {
        self.sink.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::compute::{VmFilter, VmProcessor};
    use crate::pipeline::lookup::{host_benchmarks, image_appliances, user_identities};
    use crate::pipeline::{RunOptions, WindowSelector, run};
    use crate::resource::{Host, Image, User};
    use crate::testing::{FakeCloud, RecordingSink, SinkEvent, fast_gateway, user_xml, vm_xml};
    use chrono::TimeZone;

    const VM: &str = r#"<VM>
        <ID>7</ID><UID>3</UID><GID>1</GID><GNAME>users</GNAME>
        <DEPLOY_ID>one-7</DEPLOY_ID><STATE>6</STATE>
        <STIME>1700000000</STIME><ETIME>1700003600</ETIME>
        <TEMPLATE>
          <VCPU>2</VCPU><MEMORY>2048</MEMORY>
          <DISK><IMAGE_ID>12</IMAGE_ID><SIZE>10240</SIZE></DISK>
          <DISK><SIZE>512</SIZE></DISK>
          <NIC><IP>147.251.3.10</IP></NIC>
          <NIC><IP>10.0.0.4</IP><IP6_GLOBAL>2001:718::4</IP6_GLOBAL></NIC>
          <NIC><IP>192.168.1.2</IP></NIC>
        </TEMPLATE>
        <MONITORING><NETTX>1234</NETTX><NETRX>5678</NETRX></MONITORING>
        <HISTORY_RECORDS>
          <HISTORY><HID>5</HID><RSTIME>1700000000</RSTIME><RETIME>1700000600</RETIME></HISTORY>
          <HISTORY><HID>6</HID><RSTIME>1700001000</RSTIME><RETIME>1700003000</RETIME></HISTORY>
        </HISTORY_RECORDS>
      </VM>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn settings() -> SiteSettings {
        SiteSettings {
            site_name: "CESNET".to_string(),
            cloud_type: "OpenNebula".to_string(),
            cloud_compute_service: None,
        }
    }

    fn preparer(cloud: Arc<FakeCloud>, sink: Arc<RecordingSink<VmRecord>>) -> VmPreparer {
        VmPreparer::new(ResourceReader::new(cloud, fast_gateway()), settings(), sink)
    }

    fn lookups() -> VmLookups {
        let users = [User::from_xml(&user_xml(3, 1, Some("alice@example.org"))).unwrap()];
        let images = [Image::from_xml(
            "<IMAGE><ID>12</ID><TEMPLATE>\
             <CLOUDKEEPER_APPLIANCE_MPURI>https://appdb/12</CLOUDKEEPER_APPLIANCE_MPURI>\
             </TEMPLATE></IMAGE>",
        )
        .unwrap()];
        let hosts = [Host::from_xml(
            "<HOST><ID>5</ID><CLUSTER_ID>0</CLUSTER_ID><TEMPLATE>\
             <BENCHMARK_TYPE>HEP-SPEC06</BENCHMARK_TYPE><BENCHMARK_VALUE>10.5</BENCHMARK_VALUE>\
             </TEMPLATE></HOST>",
        )
        .unwrap()];
        VmLookups {
            identities: user_identities(&users),
            appliances: image_appliances(&images),
            benchmarks: host_benchmarks(&hosts, &[]),
        }
    }

    #[test]
    fn test_assemble_full_record() {
        let preparer = preparer(Arc::new(FakeCloud::default()), RecordingSink::shared());
        let vm = VirtualMachine::from_xml(VM).unwrap();
        let record = preparer.assemble(&lookups(), &vm, now()).unwrap().remove(0);

        assert_eq!(record.vm_uuid, "7");
        assert_eq!(record.site_name, "CESNET");
        assert_eq!(record.machine_name, "one-7");
        assert_eq!(record.local_user_id.as_deref(), Some("3"));
        assert_eq!(record.local_group_id.as_deref(), Some("1"));
        assert_eq!(record.global_user_name.as_deref(), Some("alice@example.org"));
        assert_eq!(record.fqan.as_deref(), Some("/users/Role=NULL/Capability=NULL"));
        assert_eq!(record.status.as_deref(), Some("DONE"));
        assert_eq!(record.start_time.unwrap().seconds, 1_700_000_000);
        assert_eq!(record.end_time.unwrap().seconds, 1_700_003_600);
        assert_eq!(record.wall_duration.unwrap().seconds, 2600);
        assert_eq!(record.cpu_duration.unwrap().seconds, 2600);
        assert_eq!(record.suspend_duration.unwrap().seconds, 1000);
        assert_eq!(record.cpu_count, Some(2));
        assert_eq!(record.network_inbound, Some(1234));
        assert_eq!(record.network_outbound, Some(5678));
        assert_eq!(record.public_ip_count, Some(2));
        assert_eq!(record.memory, Some(2048));
        assert_eq!(record.disk, Some(10752));
        assert_eq!(record.benchmark_type.as_deref(), Some("HEP-SPEC06"));
        assert_eq!(record.benchmark, Some(10.5));
        assert_eq!(record.image_id.as_deref(), Some("https://appdb/12"));
        assert_eq!(record.cloud_type.as_deref(), Some("OpenNebula"));
        assert_eq!(record.cloud_compute_service, None);
    }

    #[test]
    fn test_lookup_misses_are_absent() {
        let preparer = preparer(Arc::new(FakeCloud::default()), RecordingSink::shared());
        let vm = VirtualMachine::from_xml(VM).unwrap();
        let record = preparer
            .assemble(&VmLookups::default(), &vm, now())
            .unwrap()
            .remove(0);

        assert_eq!(record.global_user_name, None);
        assert_eq!(record.benchmark_type, None);
        assert_eq!(record.benchmark, None);
        assert_eq!(record.image_id, None);
    }

    #[test]
    fn test_running_instance_counts_until_now() {
        let preparer = preparer(Arc::new(FakeCloud::default()), RecordingSink::shared());
        let start = now().timestamp() - 500;
        let vm = VirtualMachine::from_xml(&format!(
            "<VM><ID>1</ID><UID>1</UID><DEPLOY_ID>one-1</DEPLOY_ID>\
             <STIME>{start}</STIME><ETIME>0</ETIME><HISTORY_RECORDS><HISTORY>\
             <HID>1</HID><RSTIME>{start}</RSTIME><RETIME>0</RETIME>\
             </HISTORY></HISTORY_RECORDS></VM>"
        ))
        .unwrap();
        let record = preparer
            .assemble(&VmLookups::default(), &vm, now())
            .unwrap()
            .remove(0);

        assert_eq!(record.end_time, None);
        assert_eq!(record.suspend_duration, None);
        assert_eq!(record.wall_duration.unwrap().seconds, 500);
        assert_eq!(record.cpu_count, None);
        assert_eq!(record.disk, Some(0));
    }

    #[test]
    fn test_required_fields() {
        let preparer = preparer(Arc::new(FakeCloud::default()), RecordingSink::shared());
        let lookups = lookups();

        let no_deploy_id = VirtualMachine::from_xml(
            "<VM><ID>1</ID><UID>1</UID><STIME>1700000000</STIME></VM>",
        )
        .unwrap();
        assert!(matches!(
            preparer.assemble(&lookups, &no_deploy_id, now()),
            Err(PrepareError::Required {
                field: "machine_name",
                ..
            })
        ));

        let no_start = VirtualMachine::from_xml(
            "<VM><ID>1</ID><UID>1</UID><DEPLOY_ID>one-1</DEPLOY_ID></VM>",
        )
        .unwrap();
        assert!(matches!(
            preparer.assemble(&lookups, &no_start, now()),
            Err(PrepareError::Required {
                field: "start_time",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_instance_without_id_writes_nothing() {
        let sink = RecordingSink::shared();
        let preparer = preparer(Arc::new(FakeCloud::default()), sink.clone());
        let vm = VirtualMachine::from_xml("<VM><UID>1</UID></VM>").unwrap();

        let delivery = preparer.prepare(&lookups(), &vm).await.unwrap();
        assert_eq!(delivery.skipped, 1);
        assert!(sink.records.lock().is_empty());
    }

    #[tokio::test]
    async fn test_warmup_reads_every_reference_kind() {
        let cloud = Arc::new(FakeCloud::default());
        cloud.add_users([user_xml(1, 1, Some("alice")), user_xml(2, 1, None)]);
        cloud.add_images(["<IMAGE><ID>4</ID></IMAGE>".to_string()]);
        cloud.add_hosts(["<HOST><ID>9</ID><CLUSTER_ID>0</CLUSTER_ID></HOST>".to_string()]);
        let preparer = preparer(cloud.clone(), RecordingSink::shared());

        let lookups = preparer.initialize_lookups().await.unwrap();
        assert_eq!(lookups.identities.len(), 2);
        assert_eq!(lookups.appliances.get(4), Some("4"));
        assert_eq!(lookups.benchmarks.types.len(), 1);
        assert_eq!(lookups.benchmarks.types.get(9), None);
        assert_eq!(cloud.calls.clusters.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compute_run_end_to_end() {
        let base = Utc::now().timestamp();
        let cloud = Arc::new(FakeCloud::with_vms(
            (1..=120).map(|id| vm_xml(id, base - 3600, 0)),
        ));
        // Ended long before the window opened
        cloud.add_vms([vm_xml(500, base - 30 * 86_400, base - 20 * 86_400)]);
        cloud.add_users([user_xml(1, 1, Some("alice"))]);
        let reader = ResourceReader::new(cloud.clone(), fast_gateway());
        let sink = RecordingSink::shared();

        let selector = WindowSelector {
            period: Some(chrono::TimeDelta::days(1)),
            ..Default::default()
        };
        let summary = run(
            Arc::new(VmProcessor::new(reader.clone())),
            Arc::new(VmFilter::new(&selector, Utc::now()).unwrap()),
            Arc::new(VmPreparer::new(reader, settings(), sink.clone())),
            RunOptions::new("vm"),
        )
        .await
        .unwrap();

        assert_eq!(summary.listed, 121);
        assert_eq!(summary.forwarded, 120);
        assert_eq!(summary.written, 120);
        let records = sink.records.lock();
        assert!(records
            .iter()
            .all(|r| r.global_user_name.as_deref() == Some("alice")));
        assert_eq!(sink.events.lock().last(), Some(&SinkEvent::Finish));
    }
}
