use tracing::debug;

use super::window::{BatchSample, BatchStatsWindow};
use crate::config::BatchSizeConfig;

/// Batch size handed out before any batch has been measured.
pub const SEED_BATCH_SIZE: i64 = 64;

/// Adaptive batch sizing for one graph-fetch execution.
///
/// Each call to [`next`](Self::next) folds the last batch's memory footprint
/// into a ten-sample window and steers the next batch towards the soft memory
/// limit. Growth is proportional to the remaining headroom but capped at
/// `10^increment_streak`; consecutive capped rounds raise the cap by a decade.
/// Shrinking follows the requested target unless that is harsher than
/// `previous / 2^decrement_streak`, in which case the cut is applied and the
/// next cut doubles. A change of direction resets the opposing streak.
///
/// The controller never fails and never returns less than 1.
#[derive(Debug, Clone)]
pub struct BatchSizeController {
    window: BatchStatsWindow,
    previous_batch_size: i64,
}

impl Default for BatchSizeController {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchSizeController {
    /// Creates a controller positioned at the seed size.
    pub fn new() -> Self {
        Self {
            window: BatchStatsWindow::new(),
            previous_batch_size: SEED_BATCH_SIZE,
        }
    }

    /// Starts a new execution: clears the window and returns the seed size.
    pub fn initial(&mut self) -> i64 {
        self.window.reset();
        self.previous_batch_size = SEED_BATCH_SIZE;
        SEED_BATCH_SIZE
    }

    /// Records the batch that just completed and returns the size of the next one.
    ///
    /// Negative memory readings are treated as zero.
    pub fn next(&mut self, config: &BatchSizeConfig, last_memory_used: i64) -> i64 {
        let soft_limit = config.soft_limit_bytes();
        let previous = self.previous_batch_size;
        let memory_used = last_memory_used.max(0);

        self.window.push(BatchSample::new(previous, memory_used));
        let bytes_per_object = self.window.weighted_bytes_per_object();
        let delta = soft_limit as f64 / (bytes_per_object + 1.0) - previous as f64;

        let proposed = if delta > 0.0 {
            self.grow(previous, delta, soft_limit, memory_used)
        } else {
            self.shrink(previous, delta)
        };
        let next = if proposed <= 0 { 1 } else { proposed };

        debug!(
            previous,
            next,
            memory_used,
            soft_limit,
            bytes_per_object,
            increment_streak = self.window.increment_streak,
            decrement_streak = self.window.decrement_streak,
            "batch.controller.next"
        );
        self.previous_batch_size = next;
        next
    }

    /// Size returned by the latest call, or the seed before any call.
    pub fn previous_batch_size(&self) -> i64 {
        self.previous_batch_size
    }

    /// History backing the controller's decisions.
    pub fn window(&self) -> &BatchStatsWindow {
        &self.window
    }

    fn grow(&mut self, previous: i64, delta: f64, soft_limit: i64, memory_used: i64) -> i64 {
        let headroom = (soft_limit - memory_used) as f64 / soft_limit as f64;
        let streak = self.window.increment_streak;
        let cap = 10f64.powi(i32::try_from(streak).unwrap_or(i32::MAX));
        let damped = delta * headroom;
        let capped = damped >= cap;
        let step = if capped {
            self.window.increment_streak = streak.saturating_add(1);
            cap
        } else {
            self.window.increment_streak = 1;
            damped
        };
        self.window.decrement_streak = 1;
        debug!(previous, step, capped, "batch.controller.grow");
        // Float to int casts saturate, so a runaway step cannot wrap.
        (previous as f64 + step) as i64
    }

    fn shrink(&mut self, previous: i64, delta: f64) -> i64 {
        let streak = self.window.decrement_streak;
        let divisor = 2i64.checked_pow(streak).unwrap_or(i64::MAX);
        let cut = previous / divisor;
        let requested = previous as f64 + delta;
        let next = if requested > cut as f64 {
            self.window.decrement_streak = 1;
            requested as i64
        } else {
            self.window.decrement_streak = streak.saturating_add(1);
            cut
        };
        self.window.increment_streak = 1;
        debug!(previous, next, divisor, "batch.controller.shrink");
        next
    }
}
