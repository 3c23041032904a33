//! Image storage accounting

mod preparer;
mod processor;

pub use preparer::StoragePreparer;
pub use processor::StorageProcessor;
