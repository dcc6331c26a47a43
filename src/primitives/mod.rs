//! Low-level building blocks shared by the pooling layer.

pub mod concurrency;
