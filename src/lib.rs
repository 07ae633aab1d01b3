//! # relayvisor
//!
//! **Relayvisor** keeps a live RTSP camera feed flowing into a Kinesis Video
//! stream, indefinitely. It does not touch media itself: it describes the
//! pipeline, hands it to an external engine (`gst-launch-1.0`), watches the
//! engine's output and restarts the whole session when anything goes wrong.
//!
//! ## Architecture
//! ```text
//!   RelayConfig ─────────────────────────────┐
//!                                            ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Supervisor (one session at a time)                                  │
//! │                                                                      │
//! │  Resolving ──► Building ──► Starting ──► Running ──► Draining ──┐    │
//! │      ▲                                                          │    │
//! │      └────────────────────── BackingOff ◄───────────────────────┘    │
//! └───┬──────────────┬───────────────┬──────────────────┬────────────────┘
//!     │ per attempt  │ per attempt   │ start/stop       │ publish(Event)
//!     ▼              ▼               ▼                  ▼
//!  Resolve       build()          Engine             Bus ──► SubscriberSet ──► LogWriter, ...
//!  (GetData-     (typed           (gst-launch
//!   Endpoint)     stages)          child process)
//!                                    │ stderr / stdout
//!                                    ▼
//!                         reader tasks ──► Classifier ──► bounded queue ──► Running
//! ```
//!
//! ### Session lifecycle
//! ```text
//! loop {
//!   ├─► attempt += 1
//!   ├─► resolve endpoint         ── fatal ──► Err(Resolution)        (exit 3)
//!   │                            └─ transient ──► BackingOff
//!   ├─► build descriptor         ── invalid ──► Err(Configuration)   (exit 2)
//!   ├─► engine.start()           ── failed ──► BackingOff
//!   ├─► Running: drain stderr+stdout, wait for exit
//!   │       first of: EOS | fatal line | source unreachable | exit | empty output
//!   ├─► Draining: interrupt, wait ≤ stop_timeout, else kill
//!   └─► BackingOff: delay = restart tracker (reset after a healthy run), cancellable
//! }
//! cancellation at any point ──► graceful stop ──► Ok(())                (exit 0)
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types                                  |
//! |-----------------|---------------------------------------------------------|--------------------------------------------|
//! | **Supervision** | restart loop, one handle at a time, cancellation        | [`Supervisor`], [`SupervisorBuilder`]      |
//! | **Pipeline**    | validated, deterministic stage graph                    | [`build`], [`PipelineDescriptor`], [`Stage`] |
//! | **Resolution**  | signed `GetDataEndpoint` per attempt                    | [`Resolve`], [`KinesisVideoResolver`]      |
//! | **Engine**      | process binding with graceful and forced stop           | [`Engine`], [`PipelineHandle`], [`GstLaunchEngine`] |
//! | **Diagnostics** | line classification, terminal signals                   | [`Classifier`], [`DiagnosticEvent`], [`TerminalReason`] |
//! | **Policies**    | bounded backoff, healthy-run reset                      | [`BackoffPolicy`], [`RestartTracker`]      |
//! | **Events**      | lifecycle events and subscribers                        | [`Event`], [`Subscribe`], [`LogWriter`]    |
//! | **Errors**      | typed errors with exit codes                            | [`RuntimeError`], [`ConfigError`]          |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use clap::Parser;
//! use relayvisor::{
//!     Cli, GstLaunchEngine, KinesisVideoResolver, LogWriter, RelayConfig, Supervisor,
//!     SupervisorConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cli = Cli::parse();
//!     let relay = RelayConfig::from_cli(&cli)?;
//!     let cfg = SupervisorConfig::from_cli(&cli)?;
//!
//!     let resolver = Arc::new(KinesisVideoResolver::new(&relay)?);
//!     let engine = Arc::new(GstLaunchEngine::new(&relay));
//!
//!     let sup = Supervisor::builder(relay, cfg, resolver, engine)
//!         .with_subscriber(Arc::new(LogWriter::new()))
//!         .build();
//!     sup.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod diagnostics;
mod engine;
mod error;
mod events;
mod pipeline;
mod policies;
mod resolver;
mod subscribers;

// ---- Public re-exports ----

pub use config::{BufferPolicy, Cli, Credentials, LogFormat, RelayConfig, Topology, Tuning};
pub use core::{Supervisor, SupervisorBuilder, SupervisorConfig};
pub use diagnostics::{Channel, Classifier, DiagnosticEvent, Severity, TerminalReason};
pub use engine::{Engine, OutputStream, Outputs, PipelineHandle, GstLaunchEngine};
pub use error::{BuildError, ConfigError, EngineError, ResolveError, RuntimeError};
pub use events::{Bus, Event, EventKind, SessionState};
pub use pipeline::{PipelineDescriptor, Stage, build};
pub use policies::{BackoffPolicy, RestartTracker};
pub use resolver::{Endpoint, KinesisVideoResolver, Resolve};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
