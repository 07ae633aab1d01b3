//! # Pipeline diagnostics.
//!
//! Turns the raw output of a running pipeline into classified
//! [`DiagnosticEvent`]s and surfaces the first terminal condition.
//!
//! ```text
//! stderr ──► reader task ──► Classifier ──┐
//!                                         ├──► bounded mpsc ──► session loop
//! stdout ──► reader task ──► Classifier ──┘
//! ```
//!
//! ## Rules
//! - One reader per channel; both channels are read until EOF no matter what
//!   the consumer does.
//! - Non-terminal events use `try_send` and are dropped (counted) when the
//!   queue is full.
//! - Terminal events are never dropped.
//! - Events live only for the current session; nothing is persisted.

mod classifier;
mod reader;

use std::fmt;
use std::time::SystemTime;

pub use classifier::Classifier;
pub(crate) use reader::{DiagnosticQueue, spawn_readers};

/// Severity of one diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Fatal => "fatal",
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalReason {
    /// The pipeline reported end-of-stream.
    EndOfStream,
    /// An element, decode or sink failure.
    Error(String),
    /// The camera could not be reached or stopped answering.
    SourceUnreachable,
    /// The execution unit exited; `None` when killed by a signal.
    ProcessExited(Option<i32>),
}

impl TerminalReason {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TerminalReason::EndOfStream => "end_of_stream",
            TerminalReason::Error(_) => "error",
            TerminalReason::SourceUnreachable => "source_unreachable",
            TerminalReason::ProcessExited(_) => "process_exited",
        }
    }
}

impl fmt::Display for TerminalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalReason::EndOfStream => f.write_str("end of stream"),
            TerminalReason::Error(detail) => write!(f, "error: {detail}"),
            TerminalReason::SourceUnreachable => f.write_str("source unreachable"),
            TerminalReason::ProcessExited(Some(code)) => write!(f, "process exited with code {code}"),
            TerminalReason::ProcessExited(None) => f.write_str("process terminated by signal"),
        }
    }
}

/// Output channel a line was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Stderr,
    Stdout,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stderr => "stderr",
            Channel::Stdout => "stdout",
        }
    }
}

/// One classified output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    /// Wall-clock time the line was classified.
    pub at: SystemTime,
    pub channel: Channel,
    pub severity: Severity,
    /// The line, without its trailing newline.
    pub line: String,
    /// Set when this line ends the session.
    pub terminal: Option<TerminalReason>,
}
