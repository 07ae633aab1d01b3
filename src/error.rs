//! Error types used by the relay runtime.
//!
//! One enum per concern:
//!
//! - [`ConfigError`] configuration could not be loaded or validated (fatal).
//! - [`BuildError`] the selected options cannot form a pipeline (fatal).
//! - [`ResolveError`] the control plane could not produce an endpoint
//!   (transient → retried, fatal → process exit).
//! - [`EngineError`] the pipeline engine refused to start a pipeline (retried).
//! - [`RuntimeError`] the reasons [`Supervisor::run`](crate::Supervisor::run)
//!   gives up; each maps to a distinct process exit code.
//!
//! Runtime failures of a started pipeline are not errors in this sense: they are
//! [`TerminalReason`](crate::TerminalReason)s recovered inside the supervisor loop.
//!
//! Every enum provides `as_label` (stable snake_case string for logs).

use std::process::ExitCode;

use thiserror::Error;

/// # Errors produced while loading configuration.
///
/// Never retried: a configuration cannot heal itself.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    #[error("missing required setting {name} (env {env})")]
    Missing {
        /// Human-readable setting name.
        name: &'static str,
        /// Environment variable that supplies it.
        env: &'static str,
    },

    /// A setting is present but unusable.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Human-readable setting name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Missing { .. } => "config_missing",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }
}

/// # Errors produced by the pipeline descriptor builder.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Mutually incompatible options were selected.
    #[error("invalid pipeline configuration: {reason}")]
    InvalidConfiguration {
        /// Which options conflict.
        reason: String,
    },
}

impl BuildError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        BuildError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::InvalidConfiguration { .. } => "build_invalid_configuration",
        }
    }
}

/// # Errors produced by endpoint resolution.
///
/// `Transient` covers network failures, throttling and service-side errors;
/// `Fatal` covers unknown streams and rejected credentials.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Retry later; the control plane may recover.
    #[error("transient resolution failure: {reason}")]
    Transient {
        /// Failure detail.
        reason: String,
    },

    /// The stream does not exist or the caller may not use it.
    #[error("fatal resolution failure: {reason}")]
    Fatal {
        /// Failure detail.
        reason: String,
    },
}

impl ResolveError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::Transient { .. } => "resolve_transient",
            ResolveError::Fatal { .. } => "resolve_fatal",
        }
    }

    /// Indicates whether the supervisor should back off and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::Transient { .. })
    }
}

/// # Errors produced when starting a pipeline.
///
/// All variants are retryable (`PipelineStartError`).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine process could not be spawned.
    #[error("failed to spawn pipeline engine: {reason}")]
    Spawn {
        /// OS-level detail.
        reason: String,
    },

    /// The handle did not expose one of its output channels.
    #[error("pipeline handle is missing its {channel} channel")]
    MissingOutput {
        /// Channel name (`stderr` / `stdout`).
        channel: &'static str,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::Spawn { .. } => "engine_spawn",
            EngineError::MissingOutput { .. } => "engine_missing_output",
        }
    }
}

/// # Errors that end the supervisor loop.
///
/// A clean shutdown is `Ok(())`, not an error.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Configuration was rejected before or while building a pipeline.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Detail from [`ConfigError`] or [`BuildError`].
        reason: String,
    },

    /// The control plane reported the stream as unusable.
    #[error("stream {stream:?} cannot be resolved: {reason}")]
    Resolution {
        /// Stream the resolution was attempted for.
        stream: String,
        /// Detail from [`ResolveError::Fatal`].
        reason: String,
    },
}

impl RuntimeError {
    /// Exit code for configuration-fatal exits.
    pub const CONFIGURATION_EXIT: u8 = 2;
    /// Exit code for resolution-fatal exits.
    pub const RESOLUTION_EXIT: u8 = 3;

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use relayvisor::RuntimeError;
    ///
    /// let err = RuntimeError::Resolution { stream: "cam".into(), reason: "not found".into() };
    /// assert_eq!(err.as_label(), "runtime_resolution_fatal");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Configuration { .. } => "runtime_configuration_fatal",
            RuntimeError::Resolution { .. } => "runtime_resolution_fatal",
        }
    }

    /// Numeric process exit status for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            RuntimeError::Configuration { .. } => Self::CONFIGURATION_EXIT,
            RuntimeError::Resolution { .. } => Self::RESOLUTION_EXIT,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }
}

impl From<ConfigError> for RuntimeError {
    fn from(e: ConfigError) -> Self {
        RuntimeError::Configuration {
            reason: e.to_string(),
        }
    }
}

impl From<BuildError> for RuntimeError {
    fn from(e: BuildError) -> Self {
        RuntimeError::Configuration {
            reason: e.to_string(),
        }
    }
}
