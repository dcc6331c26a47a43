use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::Serialize;

use super::auth::ConnectionPool;
use super::key::ConnectionKey;

/// Usage counters of one pool, as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatistics {
    /// Registered pool name.
    pub pool_name: String,
    /// Datasource part of the key.
    pub datasource_id: String,
    /// Authentication strategy part of the key.
    pub auth_strategy_id: String,
    /// Principal the pool connects as.
    pub principal: Option<String>,
    /// Successful handouts since the pool was built.
    pub request_count: u64,
    /// When the pool was built, in milliseconds since the Unix epoch.
    pub created_at_epoch_ms: u64,
    /// Last successful handout, in milliseconds since the Unix epoch.
    pub last_request_epoch_ms: Option<u64>,
    /// Checked-out connections, when the pool reports them.
    pub active_connections: Option<usize>,
}

/// A built pool and its usage counters.
///
/// Entries are created once per key and live until the registry is closed.
/// Handouts run under a shared hold of the `open` gate and closing takes it
/// exclusively, so a pool is never closed while a handout is in flight and
/// never used after it was closed.
pub struct PoolEntry<P> {
    key: ConnectionKey,
    pool: P,
    open: RwLock<bool>,
    pool_name: Arc<str>,
    created_at_ms: u64,
    request_count: AtomicU64,
    last_request_ms: AtomicU64,
}

impl<P: ConnectionPool> PoolEntry<P> {
    pub(crate) fn new(key: ConnectionKey, pool: P) -> Self {
        let pool_name = Arc::from(key.pool_name());
        Self {
            key,
            pool,
            open: RwLock::new(true),
            pool_name,
            created_at_ms: epoch_millis(SystemTime::now()),
            request_count: AtomicU64::new(0),
            last_request_ms: AtomicU64::new(0),
        }
    }

    /// The physical pool.
    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Key the entry is registered under.
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// Registered pool name.
    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    /// Whether the pool has not been closed yet.
    pub fn is_open(&self) -> bool {
        *self.open.read()
    }

    /// Runs `f` against the pool unless it has been closed.
    pub(crate) fn with_open_pool<R>(&self, f: impl FnOnce(&P) -> R) -> Option<R> {
        let open = self.open.read();
        if !*open {
            return None;
        }
        Some(f(&self.pool))
    }

    /// Closes the pool once, after in-flight handouts finish. Returns whether
    /// this call closed it.
    pub(crate) fn close(&self) -> bool {
        let mut open = self.open.write();
        if !*open {
            return false;
        }
        *open = false;
        self.pool.close();
        true
    }

    pub(crate) fn shared_pool_name(&self) -> Arc<str> {
        Arc::clone(&self.pool_name)
    }

    /// Successful handouts so far. Monotonic.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Time of the last successful handout.
    pub fn last_request_at(&self) -> Option<SystemTime> {
        match self.last_request_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(UNIX_EPOCH + Duration::from_millis(ms)),
        }
    }

    pub(crate) fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.last_request_ms
            .fetch_max(epoch_millis(SystemTime::now()).max(1), Ordering::Relaxed);
    }

    /// Point-in-time statistics for this pool.
    pub fn statistics(&self) -> PoolStatistics {
        let last = self.last_request_ms.load(Ordering::Relaxed);
        PoolStatistics {
            pool_name: self.pool_name.to_string(),
            datasource_id: self.key.datasource_id().to_string(),
            auth_strategy_id: self.key.auth_strategy_id().to_string(),
            principal: self.key.acting_principal().map(str::to_string),
            request_count: self.request_count(),
            created_at_epoch_ms: self.created_at_ms,
            last_request_epoch_ms: (last != 0).then_some(last),
            active_connections: self.pool.active_connections(),
        }
    }
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
