//! Balance snapshots for a single account: the token registry, chain access,
//! the aggregation itself and the latest-snapshot writer.

pub mod aggregator;
pub mod alloy;
pub mod config;
pub mod contract_cache;
pub mod disk_storage;
pub mod error;
pub mod reqwest;
pub mod serde;
pub mod snapshot;
pub mod source;
pub mod token_list;

pub use aggregator::{Aggregator, AggregatorOptions};
pub use error::{Result, UtilsError as Error};
pub use reqwest::Reqwest;
pub use snapshot::{BalanceSnapshot, SnapshotSink, SnapshotWriter};
pub use source::{BalanceSource, RpcSource, TokenContract};
pub use token_list::{TokenDescriptor, TokenRegistry};
