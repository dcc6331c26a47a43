use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::batch::BatchPacer;
use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::pool::{ConnectionPool, ConnectionPoolRegistry};

/// Execution-time resource state owned by the engine bootstrap.
///
/// Holds the validated configuration and the process-wide pool registry, and
/// hands every execution its own [`BatchPacer`]. Pass it (or the registry)
/// by reference to execution contexts.
pub struct ResourceGovernor<P: ConnectionPool> {
    config: RuntimeConfig,
    registry: Arc<ConnectionPoolRegistry<P>>,
}

impl<P: ConnectionPool> fmt::Debug for ResourceGovernor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGovernor")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<P: ConnectionPool> ResourceGovernor<P> {
    /// Validates `config` and creates an empty registry.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        info!(
            adaptive_batching = config.batching.adaptive_enabled,
            soft_limit_bytes = config.batching.soft_limit_bytes(),
            default_batch_size = config.batching.default_batch_size,
            pool_max_size = config.pool.max_size,
            pool_min_idle = config.pool.min_idle,
            "governor.started"
        );
        Ok(Self {
            registry: Arc::new(ConnectionPoolRegistry::new(config.pool)),
            config,
        })
    }

    /// Effective configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The shared pool registry.
    pub fn registry(&self) -> &Arc<ConnectionPoolRegistry<P>> {
        &self.registry
    }

    /// A fresh batch pacer for one graph-fetch execution.
    pub fn batch_pacer(&self) -> BatchPacer {
        BatchPacer::new(self.config.batching)
    }

    /// Closes every pool. Outstanding registry handles reject further acquisitions.
    pub fn shutdown(&self) {
        self.registry.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PacerError;

    struct NoPool;

    impl ConnectionPool for NoPool {
        type Connection = ();
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = RuntimeConfig::default();
        config.batching.default_batch_size = 0;
        let err = ResourceGovernor::<NoPool>::new(config).unwrap_err();
        assert!(matches!(err, PacerError::Config(_)));
    }

    #[test]
    fn pacers_are_independent() {
        let mut config = RuntimeConfig::default();
        config.batching.adaptive_enabled = true;
        let governor = ResourceGovernor::<NoPool>::new(config).unwrap();
        let mut first = governor.batch_pacer();
        let mut second = governor.batch_pacer();
        first.first_batch_size();
        second.first_batch_size();
        first.record_batch(64);
        assert_eq!(first.rounds(), 1);
        assert_eq!(second.rounds(), 0);
        assert!(governor.registry().is_empty());
        governor.shutdown();
        assert!(governor.registry().is_closed());
    }
}
