#![forbid(unsafe_code)]

//! Adaptive sizing of graph-fetch batches.
//!
//! A [`BatchPacer`] is created per execution. When adaptive batching is
//! enabled it drives a [`BatchSizeController`], which keeps a
//! [`BatchStatsWindow`] of the last ten batches and steers the batch size
//! towards the configured soft memory limit.

mod controller;
mod pacing;
mod window;

pub use controller::{BatchSizeController, SEED_BATCH_SIZE};
pub use pacing::BatchPacer;
pub use window::{BatchSample, BatchStatsWindow, WINDOW_CAPACITY};
