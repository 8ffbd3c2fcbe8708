//! Adapters for the capability ports: transports, storage and analytics.

pub mod analytics;
pub mod http;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod stub;
