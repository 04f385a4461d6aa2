//! Background execution infrastructure.

pub mod worker;

pub use worker::{BackgroundRunnable, BackgroundWorker, WorkerHandle};
