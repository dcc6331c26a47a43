//! Execution-time resource governance for a federated query engine.
//!
//! Two mechanisms live here: adaptive sizing of graph-fetch batches against a
//! memory budget ([`batch`]), and identity-keyed connection pooling with
//! at-most-one pool build per key ([`pool`]). A [`ResourceGovernor`] ties them
//! to the process configuration.

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod error;
mod governor;
pub mod logging;
pub mod pool;
pub mod primitives;

pub use batch::{BatchPacer, BatchSample, BatchSizeController, BatchStatsWindow};
pub use config::{BatchSizeConfig, ConfigError, PoolConfig, RuntimeConfig};
pub use error::{BoxError, PacerError, Result};
pub use governor::ResourceGovernor;
pub use pool::{
    AuthenticationStrategy, ConnectionKey, ConnectionPool, ConnectionPoolRegistry, Credential,
    DatasourceSpec, Identity, LeasedConnection, PoolEntry, PoolSettings, PoolStatistics,
};
pub use primitives::concurrency::KeyedLock;
