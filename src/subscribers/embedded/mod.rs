//! # Built-in subscribers
//!
//! - [`LogWriter`]: writes every event through `tracing`.

mod log;

pub use log::LogWriter;
