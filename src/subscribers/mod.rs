//! # Event subscribers.
//!
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                         ├──► LogWriter
//!                                                         └──► custom (metrics, alerts, ...)
//! ```
//!
//! Implement [`Subscribe`] and pass it to
//! [`SupervisorBuilder::with_subscribers`](crate::SupervisorBuilder::with_subscribers).

mod embedded;
mod set;
mod subscribe;

pub use embedded::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
