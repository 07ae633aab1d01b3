//! Supervisor events: data model and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`SessionState`] event classification and payload
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! Publishers are the supervisor and the `SubscriberSet` workers
//! (overflow/panic). The only consumer is the supervisor's listener task,
//! which fans out to subscribers. See `core/supervisor.rs` for the wiring.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, SessionState};
