use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::pipeline::{PipelineError, Processor, single_shot};
use crate::reader::ResourceReader;
use crate::resource::{NetUser, Resource, User};

/// Lists every user and keeps those with active compute instances
pub struct NetworkProcessor {
    reader: ResourceReader,
}

impl NetworkProcessor {
    pub fn new(reader: ResourceReader) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl Processor for NetworkProcessor {
    type Raw = User;
    type Full = NetUser;

    async fn list(&self, raw: mpsc::Sender<User>) -> Result<u64, PipelineError> {
        let users = self.reader.list_all_users().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
        })?;
        single_shot(raw, users).await
    }

    async fn enrich(&self, user: User) -> Result<Option<NetUser>, PipelineError> {
        let id = user.id().inspect_err(|e| {
            tracing::error!(error = %e, "Listed user has no id");
        })?;
        let active_vms = self
            .reader
            .list_active_vms_for_user(id)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, user_id = id, "Failed to list active compute instances of user");
            })?;

        if active_vms.is_empty() {
            return Ok(None);
        }
        Ok(Some(NetUser { user, active_vms }))
    }
}
