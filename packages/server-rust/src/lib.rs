//! Git export server: turns approved decision records into pull requests
//! and reports each outcome back to the system of record.

pub mod config;
pub mod export;
pub mod network;
pub mod service;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ExportConfig;
pub use traits::{HostingApi, StatusSink};
