//! # Typed stage graph.
//!
//! A [`PipelineDescriptor`] is an ordered list of [`Stage`]s plus the
//! [`Endpoint`] it was built for. It says *what* the media path looks like;
//! turning it into something an engine can execute is the engine binding's job
//! (see [`GstLaunchEngine`](crate::GstLaunchEngine)).

use std::fmt;

use crate::config::{BufferPolicy, Topology};
use crate::resolver::Endpoint;

/// One stage of the media path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// RTSP client pulling RTP from the camera.
    Source { location: String, latency_ms: u32 },
    /// RTP → H.264 elementary stream.
    Depacketize,
    /// H.264 bitstream parser.
    Parse,
    /// H.264 → raw video.
    Decode,
    /// Cap the output framerate.
    RateControl { framerate: u32 },
    /// Rescale to a fixed size.
    Scale { width: u32, height: u32 },
    /// Raw video → H.264 at a target bitrate.
    Encode { bitrate_kbps: u32, key_int_max: u32 },
    /// Queue decoupling the sink from upstream.
    Buffer { policy: BufferPolicy, max_buffers: u32 },
    /// Upload to the ingestion service.
    Sink {
        stream_name: String,
        region: String,
        storage_size_mb: u32,
    },
}

impl Stage {
    /// Short stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Source { .. } => "source",
            Stage::Depacketize => "depacketize",
            Stage::Parse => "parse",
            Stage::Decode => "decode",
            Stage::RateControl { .. } => "rate",
            Stage::Scale { .. } => "scale",
            Stage::Encode { .. } => "encode",
            Stage::Buffer { .. } => "buffer",
            Stage::Sink { .. } => "sink",
        }
    }
}

/// Immutable description of one session's pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    pub(crate) topology: Topology,
    pub(crate) stages: Vec<Stage>,
    pub(crate) endpoint: Endpoint,
}

impl PipelineDescriptor {
    /// Stages in data-flow order, source first.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Endpoint this descriptor was built for.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

/// Renders stage names only (`source → depacketize → … → sink`); safe to log.
impl fmt::Display for PipelineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" → ")?;
            }
            f.write_str(stage.name())?;
        }
        Ok(())
    }
}
