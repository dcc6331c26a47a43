use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::auth::{AuthenticationStrategy, ConnectionPool, PoolSettings};
use super::entry::{PoolEntry, PoolStatistics};
use super::identity::Identity;
use super::key::{ConnectionKey, DatasourceSpec};
use crate::config::PoolConfig;
use crate::error::{PacerError, Result};
use crate::primitives::concurrency::KeyedLock;

/// A connection handed out by the registry, tagged with the pool it came from.
#[derive(Debug)]
pub struct LeasedConnection<C> {
    connection: C,
    pool_name: Arc<str>,
    key: ConnectionKey,
}

impl<C> LeasedConnection<C> {
    /// Name of the pool that served the connection.
    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    /// Key of the pool that served the connection.
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Unwraps the underlying connection.
    pub fn into_inner(self) -> C {
        self.connection
    }
}

impl<C> Deref for LeasedConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

impl<C> DerefMut for LeasedConnection<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.connection
    }
}

/// Lazily built, identity-keyed connection pools.
///
/// One registry is created at engine bootstrap and shared by every execution.
/// Pools are keyed by [`ConnectionKey`] (datasource, strategy, acting
/// principal) and each key's pool is built at most once: the first caller for
/// a key builds it under that key's lock while racing callers for the same key
/// wait and then reuse it. Callers for other keys are never blocked. A failed
/// build publishes nothing, so the next caller retries.
///
/// Pools live until [`close`](Self::close) (or drop); there is no eviction.
pub struct ConnectionPoolRegistry<P: ConnectionPool> {
    pools: RwLock<FxHashMap<ConnectionKey, Arc<PoolEntry<P>>>>,
    build_locks: KeyedLock<ConnectionKey>,
    config: PoolConfig,
    closed: AtomicBool,
}

impl<P: ConnectionPool> fmt::Debug for ConnectionPoolRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPoolRegistry")
            .field("pools", &self.len())
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<P: ConnectionPool> ConnectionPoolRegistry<P> {
    /// Creates an empty registry whose pools are sized by `config`.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pools: RwLock::new(FxHashMap::default()),
            build_locks: KeyedLock::new(),
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Pool sizing applied to every build.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns a connection for `identity` to `datasource` through `strategy`,
    /// building the pool for the resolved key on first use.
    ///
    /// Fails with [`PacerError::PoolConstruction`] when the pool cannot be
    /// built and [`PacerError::ConnectionAcquisition`] when the handout fails.
    /// Neither failure affects other keys, and neither is retried here. Once
    /// [`close`](Self::close) has started, including for callers that already
    /// found their pool, it fails with [`PacerError::RegistryClosed`].
    pub fn acquire<S>(
        &self,
        datasource: &DatasourceSpec,
        strategy: &S,
        identity: &Identity,
    ) -> Result<LeasedConnection<P::Connection>>
    where
        S: AuthenticationStrategy<P> + ?Sized,
    {
        if self.is_closed() {
            return Err(PacerError::RegistryClosed);
        }
        let key = ConnectionKey::new(
            datasource.short_id(),
            strategy.id(),
            strategy.resolve_principal(identity),
        );
        let entry = self.entry_or_build(&key, datasource, strategy, identity)?;
        if self.is_closed() {
            return Err(PacerError::RegistryClosed);
        }
        let connection = entry
            .with_open_pool(|pool| strategy.get_connection(pool, identity))
            .ok_or(PacerError::RegistryClosed)?
            .map_err(|source| {
                warn!(
                    pool_name = entry.pool_name(),
                    identity = identity.name(),
                    error = %source,
                    "pool.registry.acquire.failed"
                );
                PacerError::ConnectionAcquisition {
                    pool_name: entry.pool_name().to_string(),
                    source,
                }
            })?;
        entry.record_request();
        debug!(
            pool_name = entry.pool_name(),
            identity = identity.name(),
            request_count = entry.request_count(),
            "pool.registry.acquire"
        );
        Ok(LeasedConnection {
            connection,
            pool_name: entry.shared_pool_name(),
            key,
        })
    }

    fn entry_or_build<S>(
        &self,
        key: &ConnectionKey,
        datasource: &DatasourceSpec,
        strategy: &S,
        identity: &Identity,
    ) -> Result<Arc<PoolEntry<P>>>
    where
        S: AuthenticationStrategy<P> + ?Sized,
    {
        if let Some(entry) = self.entry(key) {
            return Ok(entry);
        }

        let _guard = self.build_locks.lock(key);
        if let Some(entry) = self.entry(key) {
            debug!(pool_name = entry.pool_name(), "pool.registry.reuse");
            return Ok(entry);
        }
        if self.is_closed() {
            return Err(PacerError::RegistryClosed);
        }

        let pool_name = key.pool_name();
        let settings = PoolSettings {
            pool_name: pool_name.clone(),
            max_size: self.config.max_size,
            min_idle: self.config.min_idle,
            connection_timeout: strategy.connection_timeout(),
            housekeeping_interval: self.config.housekeeping_interval,
        };
        info!(
            pool_name = %pool_name,
            principal = key.acting_principal(),
            datasource = key.datasource_id(),
            strategy = key.auth_strategy_id(),
            "pool.registry.build.begin"
        );
        let started = Instant::now();
        let pool = strategy
            .build_pool(datasource, identity, &settings)
            .map_err(|source| {
                warn!(
                    pool_name = %pool_name,
                    error = %source,
                    "pool.registry.build.failed"
                );
                PacerError::PoolConstruction {
                    pool_name: pool_name.clone(),
                    source,
                }
            })?;
        let elapsed = started.elapsed();
        if elapsed > settings.connection_timeout {
            warn!(
                pool_name = %pool_name,
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = settings.connection_timeout.as_millis() as u64,
                "pool.registry.build.slow"
            );
        }

        let entry = Arc::new(PoolEntry::new(key.clone(), pool));
        {
            let mut pools = self.pools.write();
            if self.is_closed() {
                drop(pools);
                entry.close();
                return Err(PacerError::RegistryClosed);
            }
            pools.insert(key.clone(), Arc::clone(&entry));
        }
        info!(
            pool_name = %pool_name,
            elapsed_ms = elapsed.as_millis() as u64,
            "pool.registry.build.complete"
        );
        Ok(entry)
    }

    /// The entry registered for `key`, if it has been built.
    pub fn entry(&self, key: &ConnectionKey) -> Option<Arc<PoolEntry<P>>> {
        self.pools.read().get(key).cloned()
    }

    /// Number of built pools.
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    /// Whether no pool has been built yet.
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Statistics for every built pool. Safe to call while pools are being acquired.
    pub fn statistics_snapshot(&self) -> BTreeMap<ConnectionKey, PoolStatistics> {
        self.entries()
            .into_iter()
            .map(|entry| (entry.key().clone(), entry.statistics()))
            .collect()
    }

    /// Statistics for every built pool as a JSON array, ordered by key.
    pub fn statistics_json(&self) -> Result<String> {
        let stats: Vec<PoolStatistics> = self.statistics_snapshot().into_values().collect();
        Ok(serde_json::to_string(&stats)?)
    }

    /// Statistics of the pool registered under `pool_name`.
    pub fn find_by_pool_name(&self, pool_name: &str) -> Option<PoolStatistics> {
        self.entries()
            .into_iter()
            .find(|entry| entry.pool_name() == pool_name)
            .map(|entry| entry.statistics())
    }

    /// Statistics of every pool acting as `principal`, ordered by pool name.
    pub fn pools_for_principal(&self, principal: &str) -> Vec<PoolStatistics> {
        let mut stats: Vec<PoolStatistics> = self
            .entries()
            .into_iter()
            .filter(|entry| entry.key().acting_principal() == Some(principal))
            .map(|entry| entry.statistics())
            .collect();
        stats.sort_by(|a, b| a.pool_name.cmp(&b.pool_name));
        stats
    }

    /// Closes every pool and rejects further acquisitions. Idempotent.
    ///
    /// Each pool is closed once the handouts already running against it
    /// finish.
    pub fn close(&self) {
        let drained: Vec<Arc<PoolEntry<P>>> = {
            let mut pools = self.pools.write();
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            pools.drain().map(|(_, entry)| entry).collect()
        };
        for entry in &drained {
            debug!(
                pool_name = entry.pool_name(),
                request_count = entry.request_count(),
                "pool.registry.close_pool"
            );
            entry.close();
        }
        info!(pools = drained.len(), "pool.registry.closed");
    }

    fn entries(&self) -> Vec<Arc<PoolEntry<P>>> {
        self.pools.read().values().cloned().collect()
    }
}

impl<P: ConnectionPool> Drop for ConnectionPoolRegistry<P> {
    fn drop(&mut self) {
        self.close();
    }
}
