//! # `gst-launch-1.0` process binding.
//!
//! Renders a [`PipelineDescriptor`] to `gst-launch-1.0 -e <element> ! <element> …`
//! and runs it as a child process.
//!
//! - Each element, property and caps string is a separate argv entry, so no
//!   shell is involved and values never need quoting.
//! - `-e` turns SIGINT into an end-of-stream: the sink flushes its buffer
//!   before the process exits.
//! - Credentials reach `kvssink` through `AWS_*` environment variables of the
//!   child only. They are never part of argv.
//! - `kill_on_drop` guarantees the process dies with its handle on every path
//!   (drop, panic, task abort).

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::{Engine, Outputs, PipelineHandle};
use crate::config::{BufferPolicy, Credentials, RelayConfig};
use crate::error::EngineError;
use crate::pipeline::{PipelineDescriptor, Stage};

/// Engine spawning one `gst-launch-1.0` process per session.
pub struct GstLaunchEngine {
    program: PathBuf,
    region: String,
    credentials: Credentials,
}

impl GstLaunchEngine {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            program: config.gst_launch.clone(),
            region: config.region.clone(),
            credentials: config.credentials.clone(),
        }
    }

    fn command(&self, descriptor: &PipelineDescriptor) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-e")
            .args(launch_args(descriptor))
            .env("AWS_ACCESS_KEY_ID", &self.credentials.access_key_id)
            .env("AWS_SECRET_ACCESS_KEY", &self.credentials.secret_access_key)
            .env("AWS_DEFAULT_REGION", &self.region)
            .env("GST_DEBUG_NO_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        match &self.credentials.session_token {
            Some(token) => cmd.env("AWS_SESSION_TOKEN", token),
            None => cmd.env_remove("AWS_SESSION_TOKEN"),
        };
        cmd
    }
}

#[async_trait]
impl Engine for GstLaunchEngine {
    async fn start(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<Box<dyn PipelineHandle>, EngineError> {
        let child = self
            .command(descriptor)
            .spawn()
            .map_err(|e| EngineError::Spawn {
                reason: format!("{}: {e}", self.program.display()),
            })?;
        debug!(pid = ?child.id(), pipeline = %descriptor, "pipeline process spawned");
        Ok(Box::new(GstProcess { child }))
    }
}

/// Running `gst-launch-1.0` child.
struct GstProcess {
    child: Child,
}

#[async_trait]
impl PipelineHandle for GstProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn take_outputs(&mut self) -> Result<Outputs, EngineError> {
        let stderr = self
            .child
            .stderr
            .take()
            .ok_or(EngineError::MissingOutput { channel: "stderr" })?;
        let stdout = self
            .child
            .stdout
            .take()
            .ok_or(EngineError::MissingOutput { channel: "stdout" })?;
        Ok(Outputs {
            stderr: Box::new(stderr),
            stdout: Box::new(stdout),
        })
    }

    async fn wait(&mut self) -> Option<i32> {
        match self.child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(error = %e, "failed to collect pipeline exit status");
                None
            }
        }
    }

    #[cfg(unix)]
    fn interrupt(&mut self) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.child.id().and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGINT) {
            warn!(pid, error = %e, "failed to interrupt pipeline process");
        }
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "failed to stop pipeline process");
        }
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "failed to kill pipeline process");
        }
    }
}

/// Renders the element chain (everything after `-e`).
pub(crate) fn launch_args(descriptor: &PipelineDescriptor) -> Vec<String> {
    let mut args = Vec::new();
    for (i, stage) in descriptor.stages().iter().enumerate() {
        if i > 0 {
            args.push("!".to_string());
        }
        args.extend(render_stage(stage));
    }
    args
}

fn render_stage(stage: &Stage) -> Vec<String> {
    match stage {
        Stage::Source {
            location,
            latency_ms,
        } => vec![
            "rtspsrc".into(),
            format!("location={location}"),
            format!("latency={latency_ms}"),
        ],
        Stage::Depacketize => vec!["rtph264depay".into()],
        Stage::Parse => vec!["h264parse".into()],
        Stage::Decode => vec!["avdec_h264".into(), "!".into(), "videoconvert".into()],
        Stage::RateControl { framerate } => vec![
            "videorate".into(),
            "!".into(),
            format!("video/x-raw,framerate={framerate}/1"),
        ],
        Stage::Scale { width, height } => vec![
            "videoscale".into(),
            "!".into(),
            format!("video/x-raw,width={width},height={height}"),
        ],
        Stage::Encode {
            bitrate_kbps,
            key_int_max,
        } => vec![
            "x264enc".into(),
            format!("bitrate={bitrate_kbps}"),
            format!("key-int-max={key_int_max}"),
            "tune=zerolatency".into(),
            "speed-preset=veryfast".into(),
            "bframes=0".into(),
            "!".into(),
            "video/x-h264,stream-format=avc,alignment=au,profile=baseline".into(),
        ],
        Stage::Buffer {
            policy,
            max_buffers,
        } => {
            let leaky = match policy {
                BufferPolicy::Leaky => "downstream",
                BufferPolicy::Block => "no",
            };
            vec![
                "queue".into(),
                format!("leaky={leaky}"),
                format!("max-size-buffers={max_buffers}"),
                "max-size-bytes=0".into(),
                "max-size-time=0".into(),
            ]
        }
        Stage::Sink {
            stream_name,
            region,
            storage_size_mb,
        } => vec![
            "kvssink".into(),
            format!("stream-name={stream_name}"),
            format!("aws-region={region}"),
            format!("storage-size={storage_size_mb}"),
        ],
    }
}
