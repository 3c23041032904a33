//! Compute instance accounting

mod filter;
mod preparer;
mod processor;

pub use filter::VmFilter;
pub use preparer::{VmLookups, VmPreparer};
pub use processor::VmProcessor;
