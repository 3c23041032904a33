// @generated
// This file is @generated by prost-build.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VmRecord {
    #[prost(string, tag = "1")]
    pub vm_uuid: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub site_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub cloud_compute_service: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "4")]
    pub machine_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "5")]
    pub local_user_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "6")]
    pub local_group_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "7")]
    pub global_user_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "8")]
    pub fqan: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "9")]
    pub status: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "10")]
    pub start_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "11")]
    pub end_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "12")]
    pub suspend_duration: ::core::option::Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "13")]
    pub wall_duration: ::core::option::Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "14")]
    pub cpu_duration: ::core::option::Option<::prost_types::Duration>,
    #[prost(message, optional, tag = "15")]
    pub cpu_count: ::core::option::Option<u32>,
    #[prost(message, optional, tag = "16")]
    pub network_type: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "17")]
    pub network_inbound: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "18")]
    pub network_outbound: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "19")]
    pub public_ip_count: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "20")]
    pub memory: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "21")]
    pub disk: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "22")]
    pub benchmark_type: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "23")]
    pub benchmark: ::core::option::Option<f32>,
    #[prost(message, optional, tag = "24")]
    pub storage_record_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "25")]
    pub image_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "26")]
    pub cloud_type: ::core::option::Option<::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VmData {
    #[prost(oneof = "vm_data::Data", tags = "1, 2")]
    pub data: ::core::option::Option<vm_data::Data>,
}
/// Nested message and enum types in `VmData`.
pub mod vm_data {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(string, tag = "1")]
        Identifier(::prost::alloc::string::String),
        #[prost(message, tag = "2")]
        Vm(super::VmRecord),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpRecord {
    #[prost(message, optional, tag = "1")]
    pub measurement_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(string, tag = "2")]
    pub site_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub cloud_compute_service: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "4")]
    pub cloud_type: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub local_user: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub local_group: ::prost::alloc::string::String,
    #[prost(string, tag = "7")]
    pub global_user_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "8")]
    pub fqan: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, tag = "9")]
    pub ip_type: ::prost::alloc::string::String,
    #[prost(uint32, tag = "10")]
    pub ip_count: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IpData {
    #[prost(oneof = "ip_data::Data", tags = "1, 2")]
    pub data: ::core::option::Option<ip_data::Data>,
}
/// Nested message and enum types in `IpData`.
pub mod ip_data {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(string, tag = "1")]
        Identifier(::prost::alloc::string::String),
        #[prost(message, tag = "2")]
        Ip(super::IpRecord),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StorageRecord {
    #[prost(string, tag = "1")]
    pub record_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub create_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(string, tag = "3")]
    pub storage_system: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub site: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "5")]
    pub storage_share: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "6")]
    pub storage_media: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "7")]
    pub file_count: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "8")]
    pub local_user: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "9")]
    pub local_group: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "10")]
    pub user_identity: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "11")]
    pub group: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "12")]
    pub start_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, optional, tag = "13")]
    pub end_time: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(uint64, tag = "14")]
    pub resource_capacity_used: u64,
    #[prost(message, optional, tag = "15")]
    pub logical_capacity_used: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "16")]
    pub resource_capacity_allocated: ::core::option::Option<u64>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StorageData {
    #[prost(oneof = "storage_data::Data", tags = "1, 2")]
    pub data: ::core::option::Option<storage_data::Data>,
}
/// Nested message and enum types in `StorageData`.
pub mod storage_data {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(string, tag = "1")]
        Identifier(::prost::alloc::string::String),
        #[prost(message, tag = "2")]
        Storage(super::StorageRecord),
    }
}
