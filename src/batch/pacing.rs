use tracing::debug;

use super::controller::BatchSizeController;
use crate::config::BatchSizeConfig;

/// Per-execution batch sizing policy.
///
/// With adaptive batching enabled every round is sized by a
/// [`BatchSizeController`]; otherwise every round uses the configured default
/// size and the controller is never consulted.
#[derive(Debug, Clone)]
pub struct BatchPacer {
    config: BatchSizeConfig,
    controller: Option<BatchSizeController>,
    current: i64,
    rounds: u64,
    total_memory_bytes: i64,
}

impl BatchPacer {
    /// Creates a pacer for one execution.
    pub fn new(config: BatchSizeConfig) -> Self {
        let controller = config.adaptive_enabled.then(BatchSizeController::new);
        Self {
            config,
            controller,
            current: config.default_batch_size,
            rounds: 0,
            total_memory_bytes: 0,
        }
    }

    /// Size of the first batch.
    pub fn first_batch_size(&mut self) -> i64 {
        self.rounds = 0;
        self.total_memory_bytes = 0;
        self.current = match self.controller.as_mut() {
            Some(controller) => controller.initial(),
            None => self.config.default_batch_size,
        };
        self.current
    }

    /// Reports the memory the last batch used and returns the size of the next one.
    pub fn record_batch(&mut self, memory_used_bytes: i64) -> i64 {
        self.rounds += 1;
        self.total_memory_bytes = self
            .total_memory_bytes
            .saturating_add(memory_used_bytes.max(0));
        self.current = match self.controller.as_mut() {
            Some(controller) => controller.next(&self.config, memory_used_bytes),
            None => self.config.default_batch_size,
        };
        debug!(
            round = self.rounds,
            memory_used_bytes,
            next = self.current,
            adaptive = self.controller.is_some(),
            "batch.pacer.round"
        );
        self.current
    }

    /// Whether the adaptive controller is in charge.
    pub fn is_adaptive(&self) -> bool {
        self.controller.is_some()
    }

    /// Size handed out most recently.
    pub fn current_batch_size(&self) -> i64 {
        self.current
    }

    /// Number of batches reported so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Memory reported across all batches of this execution.
    pub fn total_memory_bytes(&self) -> i64 {
        self.total_memory_bytes
    }

    /// Mean bytes per reported batch, or `None` before the first report.
    pub fn average_batch_memory_bytes(&self) -> Option<f64> {
        (self.rounds > 0).then(|| self.total_memory_bytes as f64 / self.rounds as f64)
    }

    /// The adaptive controller, when enabled.
    pub fn controller(&self) -> Option<&BatchSizeController> {
        self.controller.as_ref()
    }
}
