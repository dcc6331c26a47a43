use std::time::Duration;

use super::identity::Identity;
use super::key::DatasourceSpec;
use crate::error::BoxError;

/// Default time a strategy allows for building a pool or handing out a connection.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// A physical connection pool built by an [`AuthenticationStrategy`].
pub trait ConnectionPool: Send + Sync + 'static {
    /// Connection type the pool hands out.
    type Connection;

    /// Connections currently checked out, when the implementation tracks them.
    fn active_connections(&self) -> Option<usize> {
        None
    }

    /// Releases the pool's resources. Called once when the registry is torn down.
    fn close(&self) {}
}

/// Sizing handed to [`AuthenticationStrategy::build_pool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Name the pool is registered under.
    pub pool_name: String,
    /// Maximum physical connections.
    pub max_size: u32,
    /// Idle connections to keep warm.
    pub min_idle: u32,
    /// Time allowed for establishing a connection.
    pub connection_timeout: Duration,
    /// Housekeeping period of the pool implementation.
    pub housekeeping_interval: Duration,
}

/// How connections are authenticated for one family of credentials.
///
/// The registry decides *when* a pool is built and which pool serves a
/// request; the strategy decides *how* pools are built and connections
/// handed out, e.g. building under an impersonated context or attaching a
/// fresh bearer token to every connection.
pub trait AuthenticationStrategy<P: ConnectionPool>: Send + Sync {
    /// Identifier that becomes part of the pool key.
    fn id(&self) -> &str;

    /// Principal `identity` acts as, or `None` when the strategy connects as a
    /// shared account. Must be deterministic.
    fn resolve_principal(&self, identity: &Identity) -> Option<String>;

    /// Builds a new physical pool for `datasource`.
    fn build_pool(
        &self,
        datasource: &DatasourceSpec,
        identity: &Identity,
        settings: &PoolSettings,
    ) -> Result<P, BoxError>;

    /// Hands out one connection from `pool` for `identity`.
    fn get_connection(&self, pool: &P, identity: &Identity) -> Result<P::Connection, BoxError>;

    /// Timeout applied to pool construction.
    fn connection_timeout(&self) -> Duration {
        DEFAULT_CONNECTION_TIMEOUT
    }
}
