//! # External pipeline engine seam.
//!
//! The supervisor never touches media. It hands a [`PipelineDescriptor`] to an
//! [`Engine`], gets back one [`PipelineHandle`], and from then on only signals
//! and the two output channels cross the boundary.
//!
//! ```text
//! Engine::start(descriptor) ──► PipelineHandle
//!                                 ├─ take_outputs() → { stderr, stdout }   (read by diagnostics)
//!                                 ├─ wait()         → exit code            (cancel-safe)
//!                                 ├─ interrupt()    → graceful stop (EOS)
//!                                 └─ kill()         → forced stop, reaped
//! ```
//!
//! Dropping a handle must release the execution unit; [`GstLaunchEngine`]
//! relies on `kill_on_drop` for that.

mod gst;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::EngineError;
use crate::pipeline::PipelineDescriptor;

pub use gst::GstLaunchEngine;

/// One readable output channel of a running pipeline.
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Both output channels, handed out once per handle.
pub struct Outputs {
    /// Error/status channel.
    pub stderr: OutputStream,
    /// Standard output.
    pub stdout: OutputStream,
}

/// Starts pipelines from descriptors.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Launches the pipeline described by `descriptor`.
    ///
    /// # Errors
    /// [`EngineError`] when the execution unit cannot be created. Always retryable.
    async fn start(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<Box<dyn PipelineHandle>, EngineError>;
}

/// Control surface of one running pipeline.
#[async_trait]
pub trait PipelineHandle: Send {
    /// OS-level identifier, if any.
    fn id(&self) -> Option<u32>;

    /// Takes both output channels. Second call fails.
    fn take_outputs(&mut self) -> Result<Outputs, EngineError>;

    /// Waits for termination and returns the exit code (`None` when killed by a
    /// signal or the status could not be collected).
    ///
    /// Must be cancel-safe: it is polled inside `select!`.
    async fn wait(&mut self) -> Option<i32>;

    /// Requests a graceful stop. Returns immediately.
    fn interrupt(&mut self);

    /// Forces termination and reaps the execution unit.
    async fn kill(&mut self);
}
