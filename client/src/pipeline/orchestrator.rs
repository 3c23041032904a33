//! Wiring of one Processor, Filter and Preparer into a run
//!
//! Ordering guarantees of a run:
//! - lookup warm-up completes before the first `prepare`
//! - `send_identifier` follows the last `prepare`
//! - `finish` follows `send_identifier`, and runs even when that failed
//!
//! A fatal error returns immediately; dropping the task sets aborts every
//! stage still running and the collector session is never finished.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::core::constants::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_IN_FLIGHT};

use super::processor::enrich_stage;
use super::{Delivery, Filter, PipelineError, Preparer, Processor, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Resource kind, for logs
    pub kind: &'static str,
    /// Concurrent tasks per fan-out stage
    pub max_in_flight: usize,
    /// Capacity of each stage channel
    pub channel_capacity: usize,
}

impl RunOptions {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Forward accepted items, one task per item under `permits`
pub async fn filter_stage<F: Filter>(
    filter: Arc<F>,
    mut full: mpsc::Receiver<F::Item>,
    filtered: mpsc::Sender<F::Item>,
    permits: Arc<Semaphore>,
) -> Result<RunSummary, PipelineError> {
    let mut tasks: JoinSet<Result<bool, PipelineError>> = JoinSet::new();
    let mut summary = RunSummary::default();
    let count = |summary: &mut RunSummary, forwarded: bool| {
        if forwarded {
            summary.forwarded += 1;
        } else {
            summary.dropped += 1;
        }
    };

    while let Some(item) = full.recv().await {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::ChannelClosed("filter workers"))?;
        let filter = filter.clone();
        let filtered = filtered.clone();
        tasks.spawn(async move {
            let _permit = permit;
            if !filter.accept(&item) {
                return Ok(false);
            }
            filtered
                .send(item)
                .await
                .map_err(|_| PipelineError::ChannelClosed("filtered"))?;
            Ok(true)
        });

        while let Some(joined) = tasks.try_join_next() {
            count(&mut summary, joined??);
        }
    }

    while let Some(joined) = tasks.join_next().await {
        count(&mut summary, joined??);
    }
    Ok(summary)
}

/// Run the pipeline for one resource kind to completion
pub async fn run<P, F, R>(
    processor: Arc<P>,
    filter: Arc<F>,
    preparer: Arc<R>,
    options: RunOptions,
) -> Result<RunSummary, PipelineError>
where
    P: Processor,
    F: Filter<Item = P::Full>,
    R: Preparer<Item = P::Full>,
{
    let span = tracing::info_span!("pipeline", kind = options.kind);
    let capacity = options.channel_capacity.max(1);
    let max_in_flight = options.max_in_flight.max(1);

    let (raw_tx, raw_rx) = mpsc::channel(capacity);
    let (full_tx, full_rx) = mpsc::channel(capacity);
    let (filtered_tx, mut filtered_rx) = mpsc::channel(capacity);

    let mut summary = RunSummary::default();
    let mut stages: JoinSet<Result<RunSummary, PipelineError>> = JoinSet::new();
    {
        let processor = processor.clone();
        stages.spawn(
            async move {
                let pages = processor.list(raw_tx).await?;
                Ok(RunSummary {
                    pages,
                    ..Default::default()
                })
            }
            .instrument(span.clone()),
        );
    }
    stages.spawn(
        enrich_stage(
            processor,
            raw_rx,
            full_tx,
            Arc::new(Semaphore::new(max_in_flight)),
        )
        .instrument(span.clone()),
    );
    stages.spawn(
        filter_stage(
            filter,
            full_rx,
            filtered_tx,
            Arc::new(Semaphore::new(max_in_flight)),
        )
        .instrument(span.clone()),
    );

    // Warm-up runs alongside listing; a failed stage ends the run early
    let lookups = {
        let warmup = preparer.initialize_lookups().instrument(span.clone());
        tokio::pin!(warmup);
        loop {
            tokio::select! {
                lookups = &mut warmup => break Arc::new(lookups?),
                Some(joined) = stages.join_next() => summary.merge(&joined??),
            }
        }
    };
    tracing::debug!(parent: &span, "Lookup tables ready");

    let permits = Arc::new(Semaphore::new(max_in_flight));
    let mut prepares: JoinSet<Result<Delivery, PipelineError>> = JoinSet::new();
    let mut filtered_open = true;
    loop {
        tokio::select! {
            item = filtered_rx.recv(), if filtered_open => match item {
                Some(item) => {
                    let permit = permits
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| PipelineError::ChannelClosed("prepare workers"))?;
                    let preparer = preparer.clone();
                    let lookups = lookups.clone();
                    prepares.spawn(
                        async move {
                            let _permit = permit;
                            preparer.prepare(&lookups, &item).await
                        }
                        .instrument(span.clone()),
                    );
                }
                None => filtered_open = false,
            },
            Some(joined) = stages.join_next() => summary.merge(&joined??),
            Some(joined) = prepares.join_next() => summary.record(&joined??),
            else => break,
        }
    }

    // The session is finished even when the identifier could not be sent
    let identified = preparer.send_identifier().instrument(span.clone()).await;
    if let Err(e) = &identified {
        tracing::error!(parent: &span, error = %e, "Failed to send client identifier");
    }
    let finished = preparer.finish().instrument(span.clone()).await;
    identified?;
    finished?;

    tracing::info!(
        parent: &span,
        pages = summary.pages,
        listed = summary.listed,
        enriched = summary.enriched,
        forwarded = summary.forwarded,
        dropped = summary.dropped,
        written = summary.written,
        skipped = summary.skipped,
        write_failures = summary.write_failures,
        "Accounting run finished"
    );
    Ok(summary)
}
