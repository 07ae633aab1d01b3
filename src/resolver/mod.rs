//! Endpoint resolution against the video-ingestion control plane.
//!
//! ## Contents
//! - [`Endpoint`] the destination resolved for one session attempt
//! - [`Resolve`] the seam the supervisor calls once per attempt
//! - [`KinesisVideoResolver`] signed `GetDataEndpoint` client
//!
//! An [`Endpoint`] is never cached: the control plane may relocate a stream
//! between sessions, so the supervisor resolves again before every attempt.

mod kinesis;
mod sigv4;

use async_trait::async_trait;

use crate::error::ResolveError;

pub use kinesis::KinesisVideoResolver;

/// Ingestion endpoint for a single session attempt.
///
/// `kvssink` resolves its own data plane from the stream name and region, so
/// `url` is not rendered into the pipeline. Resolving it per attempt is a
/// preflight: it proves the stream exists and the credentials are accepted
/// before anything is started, and the URL is logged with the attempt.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Data-plane URL returned by the control plane.
    pub url: String,
    /// Stream the endpoint was resolved for.
    pub stream_name: String,
}

/// Resolves the current ingestion endpoint for a named stream.
///
/// One outbound call per invocation, no caching.
#[async_trait]
pub trait Resolve: Send + Sync + 'static {
    /// Returns the endpoint for `stream_name`.
    ///
    /// # Errors
    /// - [`ResolveError::Transient`] network / service unavailable, retry later
    /// - [`ResolveError::Fatal`] unknown stream or permission denied
    async fn resolve(&self, stream_name: &str) -> Result<Endpoint, ResolveError>;
}
