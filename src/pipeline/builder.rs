//! # Pipeline descriptor builder.
//!
//! [`build`] is a pure function of ([`RelayConfig`], [`Endpoint`]): no I/O, no
//! state, same input → identical descriptor.
//!
//! ## Stage order
//! ```text
//! passthrough: source → depacketize → parse → buffer → sink
//! transcode:   source → depacketize → parse → decode → [rate] → [scale] → encode → buffer → sink
//! ```
//!
//! The buffer in front of the sink defaults to [`BufferPolicy::Leaky`]: a slow
//! upload drops the oldest queued frame instead of stalling the camera side.
//!
//! ## Rejected combinations
//! - transcode without a bitrate (or with a zero bitrate / keyframe interval)
//! - size or framerate options on a passthrough topology
//! - width without height (or the reverse), zero sizes / framerate
//! - zero sink storage
//! - an endpoint resolved for a different stream

use crate::config::{RelayConfig, Topology};
use crate::error::BuildError;
use crate::resolver::Endpoint;

use super::{PipelineDescriptor, Stage};

/// Builds the descriptor for one session attempt.
///
/// # Errors
/// [`BuildError::InvalidConfiguration`] when options are mutually incompatible.
pub fn build(config: &RelayConfig, endpoint: &Endpoint) -> Result<PipelineDescriptor, BuildError> {
    let tuning = &config.tuning;

    if endpoint.stream_name != config.stream_name {
        return Err(BuildError::invalid(format!(
            "endpoint was resolved for stream {:?}, expected {:?}",
            endpoint.stream_name, config.stream_name
        )));
    }
    if tuning.storage_size_mb == 0 {
        return Err(BuildError::invalid("sink storage size must be at least 1 MiB"));
    }
    if tuning.queue_max_buffers == 0 {
        return Err(BuildError::invalid("buffer must hold at least one frame"));
    }

    let scale = match (tuning.width, tuning.height) {
        (None, None) => None,
        (Some(0), _) | (_, Some(0)) => {
            return Err(BuildError::invalid("width and height must be non-zero"));
        }
        (Some(width), Some(height)) => Some(Stage::Scale { width, height }),
        _ => return Err(BuildError::invalid("width and height must be set together")),
    };
    let rate = match tuning.framerate {
        None => None,
        Some(0) => return Err(BuildError::invalid("framerate cap must be non-zero")),
        Some(framerate) => Some(Stage::RateControl { framerate }),
    };

    let mut stages = vec![
        Stage::Source {
            location: config.source_url.clone(),
            latency_ms: tuning.latency_ms,
        },
        Stage::Depacketize,
        Stage::Parse,
    ];

    match config.topology {
        Topology::Passthrough => {
            if tuning.bitrate_kbps.is_some() || scale.is_some() || rate.is_some() {
                return Err(BuildError::invalid(
                    "bitrate, size and framerate options require the transcode topology",
                ));
            }
        }
        Topology::Transcode => {
            let bitrate_kbps = match tuning.bitrate_kbps {
                Some(b) if b > 0 => b,
                Some(_) => return Err(BuildError::invalid("transcode bitrate must be non-zero")),
                None => return Err(BuildError::invalid("transcode requires a target bitrate")),
            };
            if tuning.key_int_max == 0 {
                return Err(BuildError::invalid("keyframe interval must be non-zero"));
            }
            stages.push(Stage::Decode);
            stages.extend(rate);
            stages.extend(scale);
            stages.push(Stage::Encode {
                bitrate_kbps,
                key_int_max: tuning.key_int_max,
            });
        }
    }

    stages.push(Stage::Buffer {
        policy: tuning.buffer_policy,
        max_buffers: tuning.queue_max_buffers,
    });
    stages.push(Stage::Sink {
        stream_name: endpoint.stream_name.clone(),
        region: config.region.clone(),
        storage_size_mb: tuning.storage_size_mb,
    });

    Ok(PipelineDescriptor {
        topology: config.topology,
        stages,
        endpoint: endpoint.clone(),
    })
}
