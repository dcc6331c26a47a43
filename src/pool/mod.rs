#![forbid(unsafe_code)]

//! Identity-multiplexed connection pooling.
//!
//! The [`ConnectionPoolRegistry`] maps a [`ConnectionKey`] (datasource,
//! authentication strategy, acting principal) to a lazily built
//! [`PoolEntry`]. How pools are built and how connections are handed out is
//! left to an [`AuthenticationStrategy`].

mod auth;
mod entry;
mod identity;
mod key;
mod registry;

pub use auth::{AuthenticationStrategy, ConnectionPool, PoolSettings, DEFAULT_CONNECTION_TIMEOUT};
pub use entry::{PoolEntry, PoolStatistics};
pub use identity::{Credential, Identity};
pub use key::{ConnectionKey, DatasourceSpec};
pub use registry::{ConnectionPoolRegistry, LeasedConnection};
