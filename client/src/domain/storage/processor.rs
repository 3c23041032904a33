use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::pipeline::{PipelineError, Processor, single_shot};
use crate::reader::ResourceReader;
use crate::resource::Image;

/// Lists every image; listings already carry full detail
pub struct StorageProcessor {
    reader: ResourceReader,
}

impl StorageProcessor {
    pub fn new(reader: ResourceReader) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl Processor for StorageProcessor {
    type Raw = Image;
    type Full = Image;

    async fn list(&self, raw: mpsc::Sender<Image>) -> Result<u64, PipelineError> {
        let images = self.reader.list_all_images().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to list images");
        })?;
        single_shot(raw, images).await
    }

    async fn enrich(&self, image: Image) -> Result<Option<Image>, PipelineError> {
        Ok(Some(image))
    }
}
