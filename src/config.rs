//! # Relay configuration.
//!
//! [`Cli`] is the raw, unvalidated input: every flag can also be supplied by an
//! environment variable, so a container can be configured purely through its
//! environment (`RTSP_URL`, `KVS_STREAM_NAME`, `AWS_REGION`, `AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`).
//!
//! [`RelayConfig::from_cli`] validates it into an immutable [`RelayConfig`]
//! that is built once and moved into the supervisor. Runtime knobs
//! (backoff, timeouts, queue sizes) go to [`SupervisorConfig::from_cli`](crate::SupervisorConfig::from_cli).
//!
//! ## Rules
//! - Required values that are missing or blank → [`ConfigError::Missing`].
//! - Parseable but unusable values → [`ConfigError::Invalid`].
//! - Secrets never appear in `Debug` output.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::ConfigError;

/// Command line and environment input.
#[derive(Parser, Clone, Default)]
#[command(
    name = "relayvisor",
    version,
    about = "Relay an RTSP camera into a Kinesis Video Stream and keep it alive"
)]
pub struct Cli {
    /// RTSP URL of the camera.
    #[arg(value_name = "RTSP_URL", env = "RTSP_URL")]
    pub source_url: Option<String>,

    /// Name of the destination video stream.
    #[arg(long, env = "KVS_STREAM_NAME")]
    pub stream_name: Option<String>,

    /// Region hosting the stream.
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    pub access_key_id: Option<String>,

    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_access_key: Option<String>,

    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    pub session_token: Option<String>,

    /// Forward the camera's H.264 as-is, or re-encode it.
    #[arg(long, env = "RELAY_TOPOLOGY", value_enum, default_value_t = Topology::Passthrough)]
    pub topology: Topology,

    /// Jitter buffer of the RTSP source, in milliseconds.
    #[arg(long, env = "RELAY_LATENCY_MS", default_value_t = 200)]
    pub latency_ms: u32,

    /// Encoder bitrate (transcode only).
    #[arg(long, env = "RELAY_BITRATE_KBPS")]
    pub bitrate_kbps: Option<u32>,

    #[arg(long, env = "RELAY_WIDTH")]
    pub width: Option<u32>,

    #[arg(long, env = "RELAY_HEIGHT")]
    pub height: Option<u32>,

    /// Output framerate cap (transcode only).
    #[arg(long, env = "RELAY_FRAMERATE")]
    pub framerate: Option<u32>,

    /// Maximum distance between keyframes (transcode only).
    #[arg(long, env = "RELAY_KEY_INT_MAX", default_value_t = 45)]
    pub key_int_max: u32,

    /// What the buffering queue does when the sink falls behind.
    #[arg(long, env = "RELAY_BUFFER_POLICY", value_enum, default_value_t = BufferPolicy::Leaky)]
    pub buffer_policy: BufferPolicy,

    #[arg(long, env = "RELAY_QUEUE_MAX_BUFFERS", default_value_t = 200)]
    pub queue_max_buffers: u32,

    /// Local storage the sink may use for buffering, in MiB.
    #[arg(long, env = "RELAY_STORAGE_SIZE_MB", default_value_t = 512)]
    pub storage_size_mb: u32,

    /// Pipeline launcher executable.
    #[arg(long, env = "RELAY_GST_LAUNCH", default_value = "gst-launch-1.0")]
    pub gst_launch: PathBuf,

    /// Control-plane base URL (defaults to the regional endpoint).
    #[arg(long, env = "RELAY_CONTROL_ENDPOINT")]
    pub control_endpoint: Option<String>,

    #[arg(long, env = "RELAY_RESOLVE_TIMEOUT_SECS", default_value_t = 10)]
    pub resolve_timeout_secs: u64,

    #[arg(long, env = "RELAY_BACKOFF_FIRST_MS", default_value_t = 1_000)]
    pub backoff_first_ms: u64,

    #[arg(long, env = "RELAY_BACKOFF_MAX_MS", default_value_t = 60_000)]
    pub backoff_max_ms: u64,

    #[arg(long, env = "RELAY_BACKOFF_FACTOR", default_value_t = 2.0)]
    pub backoff_factor: f64,

    /// Random extra delay, as a fraction of the base delay.
    #[arg(long, env = "RELAY_BACKOFF_JITTER", default_value_t = 0.0)]
    pub backoff_jitter: f64,

    /// A session running at least this long resets the backoff schedule.
    #[arg(long, env = "RELAY_HEALTHY_AFTER_SECS", default_value_t = 30)]
    pub healthy_after_secs: u64,

    /// Grace period between a stop request and a forced kill.
    #[arg(long, env = "RELAY_STOP_TIMEOUT_SECS", default_value_t = 10)]
    pub stop_timeout_secs: u64,

    /// Capacity of the diagnostic line queue.
    #[arg(long, env = "RELAY_DIAGNOSTIC_QUEUE", default_value_t = 1024)]
    pub diagnostic_queue: usize,

    #[arg(long, env = "RELAY_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("source_url", &self.source_url)
            .field("stream_name", &self.stream_name)
            .field("region", &self.region)
            .field("topology", &self.topology)
            .finish_non_exhaustive()
    }
}

/// Pipeline topology variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum Topology {
    /// Depacketize and parse, no re-encoding.
    #[default]
    Passthrough,
    /// Decode, optionally rescale / cap framerate, re-encode.
    Transcode,
}

/// Queue discipline in front of the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum)]
pub enum BufferPolicy {
    /// Drop the oldest buffered frame when full.
    #[default]
    Leaky,
    /// Block upstream when full.
    Block,
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Access key pair used for the control plane and the sink.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Key id with everything but the last four characters masked.
    pub fn redacted_key_id(&self) -> String {
        let chars: Vec<char> = self.access_key_id.chars().collect();
        let keep = chars.len().saturating_sub(4);
        let tail: String = chars[keep..].iter().collect();
        format!("{}{tail}", "*".repeat(keep))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.redacted_key_id())
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Stage tuning taken verbatim into the pipeline descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuning {
    pub latency_ms: u32,
    pub bitrate_kbps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub framerate: Option<u32>,
    pub key_int_max: u32,
    pub buffer_policy: BufferPolicy,
    pub queue_max_buffers: u32,
    pub storage_size_mb: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            latency_ms: 200,
            bitrate_kbps: None,
            width: None,
            height: None,
            framerate: None,
            key_int_max: 45,
            buffer_policy: BufferPolicy::Leaky,
            queue_max_buffers: 200,
            storage_size_mb: 512,
        }
    }
}

/// Validated, immutable relay configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// RTSP URL of the camera.
    pub source_url: String,
    /// Destination stream name.
    pub stream_name: String,
    pub region: String,
    pub credentials: Credentials,
    pub topology: Topology,
    pub tuning: Tuning,
    /// Pipeline launcher executable.
    pub gst_launch: PathBuf,
    /// Control-plane base URL override.
    pub control_endpoint: Option<String>,
    /// Per-request timeout for the control plane.
    pub resolve_timeout: Duration,
}

impl RelayConfig {
    /// Validates raw input into a relay configuration.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let source_url = required(&cli.source_url, "source url", "RTSP_URL")?;
        let stream_name = required(&cli.stream_name, "stream name", "KVS_STREAM_NAME")?;
        let region = required(&cli.region, "region", "AWS_REGION")?;
        let access_key_id = required(&cli.access_key_id, "access key id", "AWS_ACCESS_KEY_ID")?;
        let secret_access_key = required(
            &cli.secret_access_key,
            "secret access key",
            "AWS_SECRET_ACCESS_KEY",
        )?;

        let scheme_ok = ["rtsp://", "rtsps://", "rtspt://"]
            .iter()
            .any(|p| source_url.to_ascii_lowercase().starts_with(p));
        if !scheme_ok {
            return Err(ConfigError::Invalid {
                name: "source url",
                reason: "expected an rtsp://, rtsps:// or rtspt:// URL".into(),
            });
        }
        if source_url.chars().any(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                name: "source url",
                reason: "must not contain whitespace".into(),
            });
        }
        if cli.queue_max_buffers == 0 {
            return Err(ConfigError::Invalid {
                name: "queue max buffers",
                reason: "must be at least 1".into(),
            });
        }
        if cli.resolve_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "resolve timeout",
                reason: "must be at least 1 second".into(),
            });
        }

        Ok(Self {
            source_url,
            stream_name,
            region,
            credentials: Credentials {
                access_key_id,
                secret_access_key,
                session_token: optional(&cli.session_token),
            },
            topology: cli.topology,
            tuning: Tuning {
                latency_ms: cli.latency_ms,
                bitrate_kbps: cli.bitrate_kbps,
                width: cli.width,
                height: cli.height,
                framerate: cli.framerate,
                key_int_max: cli.key_int_max,
                buffer_policy: cli.buffer_policy,
                queue_max_buffers: cli.queue_max_buffers,
                storage_size_mb: cli.storage_size_mb,
            },
            gst_launch: cli.gst_launch.clone(),
            control_endpoint: optional(&cli.control_endpoint),
            resolve_timeout: Duration::from_secs(cli.resolve_timeout_secs),
        })
    }
}

fn required(
    value: &Option<String>,
    name: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::Missing { name, env })
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
