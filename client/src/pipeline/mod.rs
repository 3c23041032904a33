//! Extraction-to-delivery pipeline
//!
//! ```text
//! ┌───────────┐  raw  ┌──────────┐  full  ┌──────────┐ filtered ┌───────────┐
//! │ 1. LIST   │──────▶│ 2. ENRICH│───────▶│ 3. FILTER│─────────▶│ 4. PREPARE│──▶ collector
//! │ pages or  │       │ detail / │        │ window / │          │ lookups + │
//! │ one shot  │       │ children │        │ validity │          │ assemble  │
//! └───────────┘       └──────────┘        └──────────┘          └───────────┘
//!                                                                     ▲
//!                                         warm-up (lookup tables) ────┘
//! ```
//!
//! | Stage   | Trait         | Driver                         |
//! |---------|---------------|--------------------------------|
//! | List    | [`Processor`] | [`paginate`] / [`single_shot`] |
//! | Enrich  | [`Processor`] | [`processor::enrich_stage`]    |
//! | Filter  | [`Filter`]    | [`orchestrator::filter_stage`] |
//! | Prepare | [`Preparer`]  | [`run`]                        |
//!
//! Stages are joined by bounded channels. Enrichment, filtering and
//! preparation run one task per item, each stage gated by its own semaphore.
//! Read failures and cancellation are fatal; per-record failures are logged
//! and counted.

mod error;
pub mod lookup;
pub mod orchestrator;
pub mod processor;
pub mod window;

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::resource::Resource;
use crate::writer::{RecordSink, WriterError};

pub use error::{PipelineError, PrepareError, RequiredField};
pub use lookup::{BenchmarkTable, LookupTable};
pub use orchestrator::{RunOptions, run};
pub use processor::{paginate, single_shot};
pub use window::{FilterWindow, WindowError, WindowSelector};

// ============================================================================
// STAGE TRAITS
// ============================================================================

/// Producer of one resource kind
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Item as listed
    type Raw: Send + 'static;
    /// Item after enrichment
    type Full: Resource;

    /// Push every listed item onto `raw`; returns the number of listing calls
    async fn list(&self, raw: mpsc::Sender<Self::Raw>) -> Result<u64, PipelineError>;

    /// Complete one listed item; `None` drops it
    async fn enrich(&self, raw: Self::Raw) -> Result<Option<Self::Full>, PipelineError>;
}

/// Predicate stage of one resource kind
pub trait Filter: Send + Sync + 'static {
    type Item: Resource;

    /// Whether `item` is forwarded to preparation
    fn accept(&self, item: &Self::Item) -> bool;
}

/// Record assembly and delivery of one resource kind
#[async_trait]
pub trait Preparer: Send + Sync + 'static {
    type Item: Resource;
    type Record: Send + 'static;
    type Lookups: Send + Sync + 'static;

    /// Build every lookup table; runs once, before the first `prepare`
    async fn initialize_lookups(&self) -> Result<Self::Lookups, PipelineError>;

    /// Records for one item. Required fields fail the whole item.
    fn assemble(
        &self,
        lookups: &Self::Lookups,
        item: &Self::Item,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self::Record>, PrepareError>;

    fn sink(&self) -> &dyn RecordSink<Self::Record>;

    /// Assemble and write the records of one item
    async fn prepare(
        &self,
        lookups: &Self::Lookups,
        item: &Self::Item,
    ) -> Result<Delivery, PipelineError> {
        let id = item.id().ok();
        let records = match self.assemble(lookups, item, Utc::now()) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, id = ?id, "Unable to prepare record");
                return Ok(Delivery {
                    skipped: 1,
                    ..Default::default()
                });
            }
        };

        let mut delivery = Delivery::default();
        for record in records {
            match self.sink().write(record).await {
                Ok(()) => delivery.written += 1,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::error!(error = %e, id = ?id, "Failed to write record");
                    delivery.failed += 1;
                }
            }
        }
        Ok(delivery)
    }

    async fn send_identifier(&self) -> Result<(), WriterError> {
        self.sink().send_identifier().await
    }

    async fn finish(&self) -> Result<(), WriterError> {
        self.sink().finish().await
    }
}

/// Forwards every item that has an id
pub struct PassThroughFilter<T>(PhantomData<fn() -> T>);

impl<T> Default for PassThroughFilter<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: Resource> Filter for PassThroughFilter<T> {
    type Item = T;

    fn accept(&self, item: &T) -> bool {
        match item.id() {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Dropping invalid resource");
                false
            }
        }
    }
}

// ============================================================================
// COUNTERS
// ============================================================================

/// Outcome of preparing one item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub written: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Counters of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Listing calls made (pages, or one for single-shot kinds)
    pub pages: u64,
    pub listed: u64,
    pub enriched: u64,
    pub forwarded: u64,
    pub dropped: u64,
    pub prepared: u64,
    pub written: u64,
    pub skipped: u64,
    pub write_failures: u64,
}

impl RunSummary {
    pub fn merge(&mut self, other: &RunSummary) {
        self.pages += other.pages;
        self.listed += other.listed;
        self.enriched += other.enriched;
        self.forwarded += other.forwarded;
        self.dropped += other.dropped;
        self.prepared += other.prepared;
        self.written += other.written;
        self.skipped += other.skipped;
        self.write_failures += other.write_failures;
    }

    pub fn record(&mut self, delivery: &Delivery) {
        self.prepared += 1;
        self.written += delivery.written;
        self.skipped += delivery.skipped;
        self.write_failures += delivery.failed;
    }
}
