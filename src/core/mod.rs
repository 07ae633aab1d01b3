//! Runtime core: the supervisor loop and its pieces.
//!
//! - [`supervisor`]: state machine `Resolving → … → BackingOff`, restart policy, event wiring;
//! - [`session`]: one running pipeline, `Running` and `Draining`;
//! - [`builder`]: [`SupervisorBuilder`];
//! - [`config`]: [`SupervisorConfig`];
//! - [`shutdown`]: OS termination signals.

mod builder;
mod config;
mod session;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use supervisor::Supervisor;
