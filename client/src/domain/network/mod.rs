//! Public IP accounting per user

mod preparer;
mod processor;

pub use preparer::IpPreparer;
pub use processor::NetworkProcessor;
