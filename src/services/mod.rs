//! Services that sit beside the core pipeline

pub mod observer;

pub use observer::{LoggingObserver, NoOpObserver, StateObserver};
