use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::pipeline::{PipelineError, Processor, paginate};
use crate::reader::ResourceReader;
use crate::resource::{Resource, VirtualMachine};

/// Pages through every compute instance, then retrieves each in full
pub struct VmProcessor {
    reader: ResourceReader,
}

impl VmProcessor {
    pub fn new(reader: ResourceReader) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl Processor for VmProcessor {
    type Raw = VirtualMachine;
    type Full = VirtualMachine;

    async fn list(&self, raw: mpsc::Sender<VirtualMachine>) -> Result<u64, PipelineError> {
        let reader = self.reader.clone();
        paginate(raw, move |offset| {
            let reader = reader.clone();
            async move { reader.list_vm_page(offset).await }
        })
        .await
    }

    async fn enrich(&self, vm: VirtualMachine) -> Result<Option<VirtualMachine>, PipelineError> {
        let id = vm.id().inspect_err(|e| {
            tracing::error!(error = %e, "Listed compute instance has no id");
        })?;
        let full = self.reader.retrieve_vm(id).await.inspect_err(|e| {
            tracing::error!(error = %e, id, "Failed to retrieve compute instance");
        })?;
        Ok(Some(full))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCloud, fast_gateway, vm_xml};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_lists_every_page() {
        let cloud = Arc::new(FakeCloud::with_vms((1..=230).map(|id| vm_xml(id, 100, 0))));
        let processor = VmProcessor::new(ResourceReader::new(cloud.clone(), fast_gateway()));
        let (tx, mut rx) = mpsc::channel(1);

        let listing = tokio::spawn(async move { processor.list(tx).await });
        let mut ids = Vec::new();
        while let Some(vm) = rx.recv().await {
            ids.push(vm.id().unwrap());
        }
        ids.sort_unstable();

        assert_eq!(ids, (1..=230).collect::<Vec<_>>());
        let pages = listing.await.unwrap().unwrap();
        assert_eq!(cloud.calls.vm_page.load(Ordering::SeqCst) as u64, pages);
        assert!(pages >= 4);
    }

    #[tokio::test]
    async fn test_enrich_retrieves_detail() {
        let cloud = Arc::new(FakeCloud::with_vms([vm_xml(8, 100, 0)]));
        let processor = VmProcessor::new(ResourceReader::new(cloud.clone(), fast_gateway()));

        let listed = VirtualMachine::from_xml("<VM><ID>8</ID></VM>").unwrap();
        let full = processor.enrich(listed).await.unwrap().unwrap();
        assert_eq!(full.deploy_id().unwrap(), "one-8");
        assert_eq!(cloud.calls.vm.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_enrich_failures_are_fatal() {
        let cloud = Arc::new(FakeCloud::with_vms([vm_xml(8, 100, 0)]));
        cloud.fail_vm(8);
        let processor = VmProcessor::new(ResourceReader::new(cloud, fast_gateway()));

        let listed = VirtualMachine::from_xml("<VM><ID>8</ID></VM>").unwrap();
        assert!(matches!(
            processor.enrich(listed).await,
            Err(PipelineError::Read(_))
        ));

        let nameless = VirtualMachine::from_xml("<VM><NAME>x</NAME></VM>").unwrap();
        assert!(matches!(
            processor.enrich(nameless).await,
            Err(PipelineError::Resource(_))
        ));
    }
}
