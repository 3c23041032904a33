//! Listing and enrichment drivers
//!
//! [`paginate`] walks page offsets from 1 with a pool of [`PAGE_WORKERS`]
//! concurrent fetches. The first empty page posts on a completion channel;
//! the controller checks it before every launch, so fetches already in
//! flight past the end are the only over-fetch.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::core::constants::PAGE_WORKERS;
use crate::reader::ReadError;

use super::{PipelineError, Processor, RunSummary};

/// List a paginated kind into `raw`; returns the number of pages fetched
pub async fn paginate<T, F, Fut>(raw: mpsc::Sender<T>, fetch: F) -> Result<u64, PipelineError>
where
    T: Send + 'static,
    F: Fn(u32) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, ReadError>> + Send + 'static,
{
    let workers = Arc::new(Semaphore::new(PAGE_WORKERS));
    let (done_tx, mut done_rx) = mpsc::channel::<u32>(PAGE_WORKERS);
    let mut fetches: JoinSet<Result<(), PipelineError>> = JoinSet::new();
    let mut offset: u32 = 1;
    let mut pages = 0;

    loop {
        let permit = workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::ChannelClosed("page workers"))?;

        while let Some(joined) = fetches.try_join_next() {
            joined??;
        }
        if let Ok(last) = done_rx.try_recv() {
            tracing::debug!(last_offset = last, pages, "Reached end of listing");
            break;
        }

        let fetch = fetch.clone();
        let raw = raw.clone();
        let done = done_tx.clone();
        let page_offset = offset;
        fetches.spawn(async move {
            let _permit = permit;
            let items = fetch(page_offset).await.inspect_err(|e| {
                tracing::error!(error = %e, page_offset, "Failed to list page");
            })?;
            if items.is_empty() {
                // Channel holds one slot per worker
                let _ = done.try_send(page_offset);
                return Ok(());
            }

            tracing::debug!(page_offset, count = items.len(), "Fetched page");
            for item in items {
                raw.send(item)
                    .await
                    .map_err(|_| PipelineError::ChannelClosed("raw"))?;
            }
            Ok(())
        });
        pages += 1;
        offset += 1;
    }

    while let Some(joined) = fetches.join_next().await {
        joined??;
    }
    Ok(pages)
}

/// List a kind fetched in one call into `raw`
pub async fn single_shot<T: Send + 'static>(
    raw: mpsc::Sender<T>,
    items: Vec<T>,
) -> Result<u64, PipelineError> {
    tracing::debug!(count = items.len(), "Listed all resources");
    for item in items {
        raw.send(item)
            .await
            .map_err(|_| PipelineError::ChannelClosed("raw"))?;
    }
    Ok(1)
}

/// Enrich every raw item, one task per item under `permits`
pub async fn enrich_stage<P: Processor>(
    processor: Arc<P>,
    mut raw: mpsc::Receiver<P::Raw>,
    full: mpsc::Sender<P::Full>,
    permits: Arc<Semaphore>,
) -> Result<RunSummary, PipelineError> {
    let mut tasks: JoinSet<Result<bool, PipelineError>> = JoinSet::new();
    let mut summary = RunSummary::default();
    let count = |summary: &mut RunSummary, enriched: bool| {
        if enriched {
            summary.enriched += 1;
        } else {
            summary.dropped += 1;
        }
    };

    while let Some(item) = raw.recv().await {
        summary.listed += 1;
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::ChannelClosed("enrich workers"))?;
        let processor = processor.clone();
        let full = full.clone();
        tasks.spawn(async move {
            let _permit = permit;
            match processor.enrich(item).await? {
                Some(item) => {
                    full.send(item)
                        .await
                        .map_err(|_| PipelineError::ChannelClosed("full-info"))?;
                    Ok(true)
                }
                None => Ok(false),
            }
        });

        while let Some(joined) = tasks.try_join_next() {
            count(&mut summary, joined??);
        }
    }

    while let Some(joined) = tasks.join_next().await {
        count(&mut summary, joined??);
    }
    tracing::debug!(listed = summary.listed, enriched = summary.enriched, "Enrichment finished");
    Ok(summary)
}
