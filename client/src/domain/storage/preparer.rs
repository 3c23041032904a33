use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cloudtally_proto::StorageRecord;

use crate::domain::{StorageSettings, fqan};
use crate::pipeline::lookup::load_user_identities;
use crate::pipeline::{LookupTable, PipelineError, PrepareError, Preparer, RequiredField};
use crate::reader::ResourceReader;
use crate::resource::{Image, Resource};
use crate::utils::time::to_timestamp;
use crate::writer::RecordSink;

const STORAGE_MEDIA: &str = "disk";
const FILE_COUNT: &str = "1";

pub struct StoragePreparer {
    reader: ResourceReader,
    settings: StorageSettings,
    sink: Arc<dyn RecordSink<StorageRecord>>,
}

impl StoragePreparer {
    pub fn new(
        reader: ResourceReader,
        settings: StorageSettings,
        sink: Arc<dyn RecordSink<StorageRecord>>,
    ) -> Self {
        Self {
            reader,
            settings,
            sink,
        }
    }
}

#[async_trait]
impl Preparer for StoragePreparer {
    type Item = Image;
    type Record = StorageRecord;
    /// User id to global identity
    type Lookups = LookupTable;

    async fn initialize_lookups(&self) -> Result<LookupTable, PipelineError> {
        load_user_identities(&self.reader).await
    }

    fn assemble(
        &self,
        identities: &LookupTable,
        image: &Image,
        now: DateTime<Utc>,
    ) -> Result<Vec<StorageRecord>, PrepareError> {
        image.id().required("record_id")?;
        let start = image.registration_time().required("start_time")?;
        // SIZE is in MB
        let size = image
            .size()
            .required("resource_capacity_used")?
            .saturating_mul(1024);
        let owner = image.user().ok();

        let record = StorageRecord {
            record_id: Uuid::new_v4().to_string(),
            create_time: Some(to_timestamp(now)),
            storage_system: self.settings.storage_system.clone(),
            site: self.settings.site.clone(),
            storage_share: image.datastore().ok().map(str::to_string),
            storage_media: Some(STORAGE_MEDIA.to_string()),
            file_count: Some(FILE_COUNT.to_string()),
            local_user: owner.map(|uid| uid.to_string()),
            local_group: image.group().ok().map(|gid| gid.to_string()),
            user_identity: owner
                .and_then(|uid| identities.get(uid))
                .map(str::to_string),
            group: image.group_name().ok().map(fqan),
            start_time: Some(to_timestamp(start)),
            end_time: Some(to_timestamp(now)),
            resource_capacity_used: size,
            logical_capacity_used: Some(size),
            resource_capacity_allocated: Some(size),
        };
        Ok(vec![record])
    }

    fn sink(&self) -> &dyn RecordSink<StorageRecord> {
        self.sink.as_ref()
    }
}
