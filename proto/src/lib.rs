//! Protobuf messages and gRPC client for the accounting collector
//!
//! The sources are checked in (see `proto/accounting.proto`) so building the
//! client does not require `protoc`.

pub mod accounting {
    include!("accounting.rs");
    include!("accounting.tonic.rs");
}

pub use accounting::accounting_service_client::AccountingServiceClient;
pub use accounting::{
    IpData, IpRecord, StorageData, StorageRecord, VmData, VmRecord, ip_data, storage_data,
    vm_data,
};
