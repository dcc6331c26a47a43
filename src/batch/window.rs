use std::collections::VecDeque;

/// Number of recent batches the controller smooths over.
pub const WINDOW_CAPACITY: usize = 10;

const WEIGHT_STEP: f64 = 0.1;

/// Size and memory footprint of one completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSample {
    /// Objects requested in the batch.
    pub batch_size: i64,
    /// Bytes the batch occupied once materialized.
    pub memory_used_bytes: i64,
}

impl BatchSample {
    /// Creates a sample.
    pub fn new(batch_size: i64, memory_used_bytes: i64) -> Self {
        Self {
            batch_size,
            memory_used_bytes,
        }
    }
}

/// Bounded FIFO history of recent batches plus the controller's streak counters.
///
/// One window belongs to exactly one in-flight execution; it is never shared.
#[derive(Debug, Clone)]
pub struct BatchStatsWindow {
    samples: VecDeque<BatchSample>,
    pub(super) increment_streak: u32,
    pub(super) decrement_streak: u32,
}

impl Default for BatchStatsWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchStatsWindow {
    /// Creates an empty window with both streaks at their baseline of 1.
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAPACITY),
            increment_streak: 1,
            decrement_streak: 1,
        }
    }

    /// Drops all samples and returns both streaks to 1.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.increment_streak = 1;
        self.decrement_streak = 1;
    }

    /// Appends `sample`, evicting and returning the oldest one when the window is full.
    pub fn push(&mut self, sample: BatchSample) -> Option<BatchSample> {
        let evicted = if self.samples.len() == WINDOW_CAPACITY {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no batch has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Retained samples, oldest first.
    pub fn samples(&self) -> impl DoubleEndedIterator<Item = &BatchSample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Most recently recorded sample.
    pub fn latest(&self) -> Option<&BatchSample> {
        self.samples.back()
    }

    /// Exponent driving the growth cap (`10^streak`).
    pub fn increment_streak(&self) -> u32 {
        self.increment_streak
    }

    /// Exponent driving the shrink divisor (`2^streak`).
    pub fn decrement_streak(&self) -> u32 {
        self.decrement_streak
    }

    /// Recency-weighted bytes per object across the window.
    ///
    /// Walks newest to oldest with weights 1.0, 0.9, ... 0.1 and returns
    /// `Σ(w·memory) / Σ(w·size)`, a ratio of sums. Returns 0 for an empty window.
    pub fn weighted_bytes_per_object(&self) -> f64 {
        let mut weighted_memory = 0.0;
        let mut weighted_objects = 0.0;
        for (step, sample) in self.samples.iter().rev().enumerate() {
            let weight = 1.0 - WEIGHT_STEP * step as f64;
            weighted_memory += weight * sample.memory_used_bytes as f64;
            weighted_objects += weight * sample.batch_size as f64;
        }
        if weighted_objects > 0.0 {
            weighted_memory / weighted_objects
        } else {
            0.0
        }
    }
}
